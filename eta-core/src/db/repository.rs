use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::models::{
    DocumentKind, DocumentStatus, NewSubmissionLog, NewTaxDocument, SubmissionLog, TaxDocument,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("Record not found")]
    NotFound,

    #[error("Record already exists: {0}")]
    AlreadyExists(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Selection criteria for [`DocumentRepository::list_documents`].
/// Unset fields match everything; dates are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentFilter {
    pub company: Option<String>,
    pub kind: Option<DocumentKind>,
    pub status: Option<DocumentStatus>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
}

impl DocumentFilter {
    pub fn for_company(company: &str) -> Self {
        Self {
            company: Some(company.to_string()),
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: DocumentStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn between(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.from_date = Some(from);
        self.to_date = Some(to);
        self
    }

    pub fn matches(&self, doc: &TaxDocument) -> bool {
        self.company.as_ref().is_none_or(|c| *c == doc.company)
            && self.kind.is_none_or(|k| k == doc.kind)
            && self.status.is_none_or(|s| s == doc.status)
            && self.from_date.is_none_or(|d| doc.posting_date >= d)
            && self.to_date.is_none_or(|d| doc.posting_date <= d)
    }
}

#[async_trait]
pub trait DocumentRepository: Send + Sync {
    // Tax documents
    async fn insert_document(&self, doc: NewTaxDocument) -> Result<TaxDocument, RepositoryError>;

    async fn get_document(
        &self,
        kind: DocumentKind,
        document_id: &str,
    ) -> Result<TaxDocument, RepositoryError>;

    /// Persist the lifecycle fields of an existing document.
    async fn update_document(&self, doc: &TaxDocument) -> Result<(), RepositoryError>;

    /// Remove a document whose business document was deleted by the host.
    async fn retire_document(
        &self,
        kind: DocumentKind,
        document_id: &str,
    ) -> Result<(), RepositoryError>;

    /// Matching documents ordered by posting date, then id.
    async fn list_documents(
        &self,
        filter: &DocumentFilter,
    ) -> Result<Vec<TaxDocument>, RepositoryError>;

    // Submission logs
    async fn insert_log(&self, log: NewSubmissionLog) -> Result<SubmissionLog, RepositoryError>;

    async fn get_log(&self, id: i64) -> Result<SubmissionLog, RepositoryError>;

    /// Most recent first.
    async fn list_logs(&self, limit: Option<u32>) -> Result<Vec<SubmissionLog>, RepositoryError>;
}
