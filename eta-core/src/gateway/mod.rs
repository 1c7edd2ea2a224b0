//! Contract of the tax authority gateway.
//!
//! The gateway owns everything that touches the network or the signing
//! token: building the authority payload, signing it, transmitting it and
//! parsing the answer. The lifecycle manager only sees the typed requests
//! and responses defined here.

mod error;
mod urls;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::{DocumentKind, DocumentStatus};

pub use error::{GatewayError, RemoteError, RemoteErrorDetail};
pub use urls::{Environment, EtaUrls};

/// How a document is addressed on the authority side.
///
/// Receipts always carry the point-of-sale profile they were issued from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentAddress {
    pub kind: DocumentKind,
    pub document_id: String,
    pub pos_profile: Option<String>,
}

/// Identifier used when asking the authority for the latest status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusLookup {
    Submission(String),
    Uuid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusQuery {
    pub address: DocumentAddress,
    pub lookup: StatusLookup,
}

/// Answer to a sign-and-submit or submit request.
///
/// `status` is `Signed` when the document was signed but transmission was
/// deferred, in which case no UUID has been issued yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    pub signature: String,
    pub external_uuid: Option<String>,
    pub submission_id: Option<String>,
    pub status: DocumentStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteStatus {
    pub status: DocumentStatus,
    pub cancellation_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelRequest {
    pub address: DocumentAddress,
    pub external_uuid: String,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CancellationStatus {
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancellationOutcome {
    pub status: CancellationStatus,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactFormat {
    Json,
    Pdf,
}

impl ArtifactFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Pdf => "pdf",
        }
    }
}

#[async_trait]
pub trait TaxAuthorityGateway: Send + Sync {
    /// Sign the document and transmit it.
    async fn sign_and_submit(
        &self,
        address: &DocumentAddress,
    ) -> Result<SubmissionReceipt, GatewayError>;

    /// Transmit a document that already carries a signature.
    async fn submit_signed(
        &self,
        address: &DocumentAddress,
        signature: &str,
    ) -> Result<SubmissionReceipt, GatewayError>;

    async fn refresh_status(&self, query: &StatusQuery) -> Result<RemoteStatus, GatewayError>;

    async fn cancel(&self, request: &CancelRequest) -> Result<CancellationOutcome, GatewayError>;

    /// Download the authority rendering of a document. `external_uuid` is
    /// always present for [`ArtifactFormat::Pdf`].
    async fn fetch_artifact(
        &self,
        address: &DocumentAddress,
        external_uuid: Option<&str>,
        format: ArtifactFormat,
    ) -> Result<Vec<u8>, GatewayError>;
}
