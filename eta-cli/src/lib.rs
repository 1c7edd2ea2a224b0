pub mod app;
pub mod config;
pub mod import;
pub mod logging;

pub use config::load_settings;
pub use import::{DocumentLoader, DocumentLoaderError, DocumentRecord, LoadSummary};
