use async_trait::async_trait;
use eta_core::db::{DbConfig, DocumentRepository, RepositoryError, RepositoryFactory};
use tracing::debug;

use crate::repository::SqliteRepository;

/// The `"sqlite"` backend.
///
/// `connection_string` may be a file path (created when missing), a
/// `sqlite://` URL, or `:memory:`.
pub struct SqliteRepositoryFactory;

#[async_trait]
impl RepositoryFactory for SqliteRepositoryFactory {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn DocumentRepository>, RepositoryError> {
        let repo = SqliteRepository::new(&config.connection_string)
            .await
            .map_err(|e| RepositoryError::Connection(format!("{e:#}")))?;
        repo.run_migrations()
            .await
            .map_err(|e| RepositoryError::Database(format!("migrations failed: {e:#}")))?;
        debug!(db = %config.connection_string, "sqlite store ready");
        Ok(Box::new(repo))
    }
}
