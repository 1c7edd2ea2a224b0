mod secret_expiry;
mod submission_log;
mod tax_document;

pub use secret_expiry::{NEAR_EXPIRY_DAYS, SecretExpiry};
pub use submission_log::{LogEntry, NewSubmissionLog, SubmissionLog, SubmissionState};
pub use tax_document::{
    DocumentKind, DocumentStatus, IndicatorColor, NewTaxDocument, StatusIndicator, TaxDocument,
};
