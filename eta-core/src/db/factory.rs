use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;

use super::repository::{DocumentRepository, RepositoryError};

/// Where documents and submission logs are kept.
///
/// `backend` selects a registered [`RepositoryFactory`]; the
/// `connection_string` is handed to it untouched (`eta.db`, `:memory:` for
/// SQLite).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    pub backend: String,
    pub connection_string: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            backend: "sqlite".to_string(),
            connection_string: "eta.db".to_string(),
        }
    }
}

impl DbConfig {
    /// A throwaway store for `backend`, gone when the repository is dropped.
    pub fn in_memory(backend: &str) -> Self {
        Self {
            backend: backend.to_string(),
            connection_string: ":memory:".to_string(),
        }
    }
}

/// Opens a [`DocumentRepository`] for one storage backend.
///
/// Implementations bring the schema up to date before returning.
#[async_trait]
pub trait RepositoryFactory: Send + Sync {
    fn backend_name(&self) -> &'static str;

    async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn DocumentRepository>, RepositoryError>;
}

/// Storage backends known to an entry point, by name.
#[derive(Default)]
pub struct RepositoryRegistry {
    factories: BTreeMap<&'static str, Box<dyn RepositoryFactory>>,
}

impl RepositoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A later factory with the same name wins.
    pub fn register(&mut self, factory: Box<dyn RepositoryFactory>) {
        self.factories.insert(factory.backend_name(), factory);
    }

    /// Alphabetical.
    pub fn available_backends(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }

    /// Open the store described by `config`.
    ///
    /// Fails with [`RepositoryError::Configuration`] for an unregistered
    /// backend or a blank connection string; otherwise returns whatever the
    /// backend's factory returns.
    pub async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn DocumentRepository>, RepositoryError> {
        let Some(factory) = self.factories.get(config.backend.as_str()) else {
            return Err(RepositoryError::Configuration(format!(
                "unknown backend '{}'; available: {:?}",
                config.backend,
                self.available_backends()
            )));
        };
        if config.connection_string.trim().is_empty() {
            return Err(RepositoryError::Configuration(format!(
                "backend '{}' needs a connection string",
                config.backend
            )));
        }

        factory.create(config).await
    }
}
