pub mod config;
pub mod db;
pub mod gateway;
pub mod lifecycle;
pub mod models;
pub mod report;
pub mod service;

pub use db::repository::{DocumentRepository, RepositoryError};
pub use lifecycle::{ErrorKind, LifecycleError, LifecycleManager};
pub use models::*;
pub use service::{BatchSubmission, DocumentOutcome, DocumentService, ServiceError};
