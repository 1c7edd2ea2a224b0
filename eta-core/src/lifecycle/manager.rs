use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::gateway::{
    ArtifactFormat, CancelRequest, CancellationStatus, DocumentAddress, GatewayError, RemoteError,
    StatusLookup, StatusQuery, SubmissionReceipt, TaxAuthorityGateway,
};
use crate::models::{DocumentKind, DocumentStatus, TaxDocument};

use super::error::LifecycleError;
use super::in_flight::{InFlight, InFlightGuard};

/// Enforces the legal transitions of a [`TaxDocument`] and mediates every
/// call to the tax authority.
///
/// Operations take the current document by reference and return the updated
/// value; on any error the caller's copy is the state of record. At most one
/// operation runs per document at a time; a second one is refused with
/// [`LifecycleError::InFlight`] instead of being queued.
pub struct LifecycleManager {
    gateway: Arc<dyn TaxAuthorityGateway>,
    in_flight: InFlight,
}

fn label(doc: &TaxDocument) -> String {
    format!("{} {}", doc.kind, doc.document_id)
}

fn validation(doc: &TaxDocument, message: impl Into<String>) -> LifecycleError {
    LifecycleError::Validation {
        document: label(doc),
        message: message.into(),
    }
}

fn conflict(doc: &TaxDocument, message: impl Into<String>) -> LifecycleError {
    LifecycleError::Conflict {
        document: label(doc),
        message: message.into(),
    }
}

fn gateway_error(doc: &TaxDocument, source: GatewayError) -> LifecycleError {
    warn!(document = %doc.document_id, kind = %doc.kind, error = %source, "tax authority call failed");
    LifecycleError::Gateway {
        document: label(doc),
        source,
    }
}

fn malformed(doc: &TaxDocument, message: impl Into<String>) -> LifecycleError {
    gateway_error(doc, GatewayError::MalformedResponse(message.into()))
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Build the kind-specific address, refusing documents the authority would
/// reject for missing identifiers.
pub fn address_of(doc: &TaxDocument) -> Result<DocumentAddress, LifecycleError> {
    if doc.document_id.trim().is_empty() {
        return Err(validation(doc, "document id is required"));
    }

    let pos_profile = match doc.kind {
        DocumentKind::Receipt => Some(
            doc.pos_profile
                .as_deref()
                .and_then(non_blank)
                .ok_or_else(|| validation(doc, "point-of-sale profile is required for receipts"))?,
        ),
        DocumentKind::Invoice => None,
    };

    Ok(DocumentAddress {
        kind: doc.kind,
        document_id: doc.document_id.clone(),
        pos_profile,
    })
}

impl LifecycleManager {
    pub fn new(gateway: Arc<dyn TaxAuthorityGateway>) -> Self {
        Self {
            gateway,
            in_flight: InFlight::default(),
        }
    }

    /// Whether an operation is currently running for the given document.
    pub fn is_in_flight(&self, kind: DocumentKind, document_id: &str) -> bool {
        self.in_flight.contains(&(kind, document_id.to_string()))
    }

    fn acquire(&self, doc: &TaxDocument) -> Result<InFlightGuard<'_>, LifecycleError> {
        self.in_flight
            .try_acquire(doc.key())
            .ok_or_else(|| LifecycleError::InFlight {
                document: label(doc),
            })
    }

    /// Refuse documents that are already inconsistent; nothing is sent for them.
    fn check_input(doc: &TaxDocument) -> Result<(), LifecycleError> {
        doc.check_invariants().map_err(|message| validation(doc, message))
    }

    fn finish(doc: &TaxDocument, updated: TaxDocument) -> Result<TaxDocument, LifecycleError> {
        updated
            .check_invariants()
            .map_err(|message| malformed(doc, message))?;
        Ok(updated)
    }

    /// Fold a submission answer into a copy of `doc`.
    fn apply_receipt(
        doc: &TaxDocument,
        receipt: SubmissionReceipt,
        keep_signature: bool,
    ) -> Result<TaxDocument, LifecycleError> {
        if !matches!(
            receipt.status,
            DocumentStatus::Signed | DocumentStatus::Submitted
        ) {
            return Err(malformed(
                doc,
                format!("submission answered with status '{}'", receipt.status),
            ));
        }

        let external_uuid = receipt.external_uuid.as_deref().and_then(non_blank);
        if receipt.status == DocumentStatus::Submitted && external_uuid.is_none() {
            return Err(malformed(doc, "submission accepted without a document UUID"));
        }
        if let (Some(current), Some(answered)) = (doc.external_uuid.as_deref(), external_uuid.as_deref()) {
            if current != answered {
                return Err(malformed(
                    doc,
                    format!("authority answered UUID '{answered}' for a document already known as '{current}'"),
                ));
            }
        }

        let mut updated = doc.clone();
        if !keep_signature {
            updated.signature = non_blank(&receipt.signature);
        }
        if updated.external_uuid.is_none() {
            updated.external_uuid = external_uuid;
        }
        if let Some(submission_id) = receipt.submission_id.as_deref().and_then(non_blank) {
            updated.submission_id = Some(submission_id);
        }
        updated.status = receipt.status;

        Self::finish(doc, updated)
    }

    /// Not Signed → Submitted (or Signed when transmission is deferred).
    pub async fn sign_and_submit(&self, doc: &TaxDocument) -> Result<TaxDocument, LifecycleError> {
        Self::check_input(doc)?;
        let address = address_of(doc)?;
        if doc.status != DocumentStatus::NotSigned {
            return Err(conflict(
                doc,
                format!("cannot sign a document that is '{}'", doc.status),
            ));
        }

        let _guard = self.acquire(doc)?;
        debug!(document = %doc.document_id, kind = %doc.kind, "sign and submit");

        let receipt = self
            .gateway
            .sign_and_submit(&address)
            .await
            .map_err(|e| gateway_error(doc, e))?;
        let updated = Self::apply_receipt(doc, receipt, false)?;

        info!(
            document = %updated.document_id,
            status = %updated.status,
            uuid = updated.external_uuid.as_deref().unwrap_or(""),
            "document signed"
        );
        Ok(updated)
    }

    /// Signed → Submitted, reusing the existing signature.
    pub async fn submit(&self, doc: &TaxDocument) -> Result<TaxDocument, LifecycleError> {
        Self::check_input(doc)?;
        let address = address_of(doc)?;
        if doc.status != DocumentStatus::Signed {
            return Err(conflict(
                doc,
                format!("only signed documents can be submitted, this one is '{}'", doc.status),
            ));
        }
        let signature = doc
            .signature
            .as_deref()
            .and_then(non_blank)
            .ok_or_else(|| validation(doc, "document has no signature"))?;

        let _guard = self.acquire(doc)?;
        debug!(document = %doc.document_id, kind = %doc.kind, "submit signed document");

        let receipt = self
            .gateway
            .submit_signed(&address, &signature)
            .await
            .map_err(|e| gateway_error(doc, e))?;
        if receipt.status != DocumentStatus::Submitted {
            return Err(malformed(
                doc,
                format!("submission answered with status '{}'", receipt.status),
            ));
        }
        let updated = Self::apply_receipt(doc, receipt, true)?;

        info!(document = %updated.document_id, status = %updated.status, "document submitted");
        Ok(updated)
    }

    /// Reconcile the local status with the authority.
    ///
    /// Never touches the signature or the UUID. Documents the authority has
    /// never seen (no UUID, no submission id, not yet submitted) and cancelled
    /// documents are returned unchanged without a round trip.
    pub async fn refresh_status(&self, doc: &TaxDocument) -> Result<TaxDocument, LifecycleError> {
        Self::check_input(doc)?;
        if doc.status.is_terminal() {
            return Ok(doc.clone());
        }

        let lookup = match (doc.external_uuid.as_deref(), doc.submission_id.as_deref()) {
            (Some(uuid), _) if !uuid.trim().is_empty() => StatusLookup::Uuid(uuid.trim().to_string()),
            (_, Some(id)) if !id.trim().is_empty() => StatusLookup::Submission(id.trim().to_string()),
            _ if doc.status.is_remote() => {
                return Err(validation(
                    doc,
                    "a submission id or document UUID is required to refresh the status",
                ));
            }
            _ => return Ok(doc.clone()),
        };
        let query = StatusQuery {
            address: address_of(doc)?,
            lookup,
        };

        let _guard = self.acquire(doc)?;
        debug!(document = %doc.document_id, kind = %doc.kind, lookup = ?query.lookup, "refresh status");

        let remote = self
            .gateway
            .refresh_status(&query)
            .await
            .map_err(|e| gateway_error(doc, e))?;
        if !remote.status.is_remote() {
            return Err(malformed(
                doc,
                format!("status lookup answered '{}'", remote.status),
            ));
        }

        let mut updated = doc.clone();
        updated.status = remote.status;
        if remote.status == DocumentStatus::Cancelled {
            if let Some(reason) = remote.cancellation_reason.as_deref().and_then(non_blank) {
                updated.cancellation_reason = Some(reason);
            }
        }
        let updated = Self::finish(doc, updated)?;

        if updated.status != doc.status {
            info!(
                document = %updated.document_id,
                from = %doc.status,
                to = %updated.status,
                "status reconciled"
            );
        }
        Ok(updated)
    }

    /// Valid/Submitted → Cancelled, only once the authority confirms.
    pub async fn cancel(&self, doc: &TaxDocument, reason: &str) -> Result<TaxDocument, LifecycleError> {
        Self::check_input(doc)?;
        let reason = non_blank(reason)
            .ok_or_else(|| validation(doc, "a cancellation reason is required"))?;
        let external_uuid = doc
            .external_uuid
            .as_deref()
            .and_then(non_blank)
            .ok_or_else(|| validation(doc, "only documents with a UUID can be cancelled"))?;
        if !doc.status.is_cancellable() {
            return Err(conflict(
                doc,
                format!("cannot cancel a document that is '{}'", doc.status),
            ));
        }
        let request = CancelRequest {
            address: address_of(doc)?,
            external_uuid,
            reason: reason.clone(),
        };

        let _guard = self.acquire(doc)?;
        debug!(document = %doc.document_id, kind = %doc.kind, "request cancellation");

        let outcome = self
            .gateway
            .cancel(&request)
            .await
            .map_err(|e| gateway_error(doc, e))?;
        if outcome.status == CancellationStatus::Failure {
            let message = outcome
                .message
                .unwrap_or_else(|| "cancellation was not accepted".to_string());
            return Err(gateway_error(
                doc,
                GatewayError::Remote(RemoteError::new(message).with_title("Cancellation rejected")),
            ));
        }

        let mut updated = doc.clone();
        updated.status = DocumentStatus::Cancelled;
        updated.cancellation_reason = Some(reason);
        let updated = Self::finish(doc, updated)?;

        info!(document = %updated.document_id, "document cancelled");
        Ok(updated)
    }

    /// Record a signature produced by the external signer: Not Signed → Signed.
    pub fn attach_signature(
        &self,
        doc: &TaxDocument,
        signature: &str,
    ) -> Result<TaxDocument, LifecycleError> {
        Self::check_input(doc)?;
        let signature = non_blank(signature)
            .ok_or_else(|| validation(doc, "signature is empty"))?;
        if doc.status != DocumentStatus::NotSigned {
            return Err(conflict(
                doc,
                format!("cannot attach a signature to a document that is '{}'", doc.status),
            ));
        }
        let _guard = self.acquire(doc)?;

        let mut updated = doc.clone();
        updated.signature = Some(signature);
        updated.status = DocumentStatus::Signed;
        let updated = Self::finish(doc, updated)?;

        info!(document = %updated.document_id, "signature attached");
        Ok(updated)
    }

    /// Explicit local reset: Signed → Not Signed, dropping the signature.
    ///
    /// Only possible while the authority has not issued a UUID.
    pub fn reset_signature(&self, doc: &TaxDocument) -> Result<TaxDocument, LifecycleError> {
        Self::check_input(doc)?;
        if doc.status != DocumentStatus::Signed {
            return Err(conflict(
                doc,
                format!("only signed documents can be reset, this one is '{}'", doc.status),
            ));
        }
        if doc.has_external_uuid() {
            return Err(conflict(doc, "the tax authority already issued a UUID"));
        }
        let _guard = self.acquire(doc)?;

        let mut updated = doc.clone();
        updated.signature = None;
        updated.submission_id = None;
        updated.status = DocumentStatus::NotSigned;

        info!(document = %updated.document_id, "signature reset");
        Self::finish(doc, updated)
    }

    /// Download the authority JSON or PDF rendering. Never changes state.
    pub async fn fetch_artifact(
        &self,
        doc: &TaxDocument,
        format: ArtifactFormat,
    ) -> Result<Vec<u8>, LifecycleError> {
        Self::check_input(doc)?;
        let address = address_of(doc)?;
        let external_uuid = doc.external_uuid.as_deref().and_then(non_blank);
        if format == ArtifactFormat::Pdf && external_uuid.is_none() {
            return Err(validation(doc, "a document UUID is required to download the PDF"));
        }

        debug!(document = %doc.document_id, format = format.extension(), "fetch artifact");
        self.gateway
            .fetch_artifact(&address, external_uuid.as_deref(), format)
            .await
            .map_err(|e| gateway_error(doc, e))
    }
}
