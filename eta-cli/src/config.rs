use std::fs;
use std::path::{Path, PathBuf};

use eta_core::config::{ConfigError, EtaSettings};
use tracing::debug;

/// Looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "eta.toml";

/// Parse and validate settings from TOML text.
pub fn parse_settings(text: &str) -> Result<EtaSettings, ConfigError> {
    let settings: EtaSettings =
        toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
    settings.validate()?;
    Ok(settings)
}

/// Load settings from `path`, or from [`DEFAULT_CONFIG_FILE`] when it exists.
/// With neither, the built-in defaults are used.
pub fn load_settings(path: Option<&Path>) -> Result<EtaSettings, ConfigError> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
            if !fallback.is_file() {
                debug!("no config file, using defaults");
                return Ok(EtaSettings::default());
            }
            fallback
        }
    };

    let text = fs::read_to_string(&path).map_err(|e| ConfigError::Read {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    debug!(path = %path.display(), "loading config");
    parse_settings(&text)
}
