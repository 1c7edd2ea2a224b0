//! Settings shared by every entry point.
//!
//! Deserialized from TOML by the binaries; this crate only defines the
//! shape and the rules a loaded configuration must satisfy.

use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;

use crate::db::DbConfig;
use crate::gateway::{Environment, EtaUrls};
use crate::models::SecretExpiry;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config '{path}': {message}")]
    Read { path: String, message: String },

    #[error("Invalid config: {0}")]
    Parse(String),

    #[error("No default connector set for company '{0}'")]
    NoDefaultConnector(String),

    #[error("There can only be one default connector for company '{0}'")]
    DuplicateDefault(String),

    #[error("No enabled POS connector for POS profile '{0}'")]
    NoPosConnector(String),

    #[error("POS profile '{0}' already has an enabled POS connector")]
    DuplicatePosConnector(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Bare level or any `EnvFilter` directive.
    pub level: String,
    /// Append log records to this file as well as stdout.
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// Credentials and dates of one company's tax authority account.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConnectorConfig {
    pub company: String,
    #[serde(default)]
    pub environment: Environment,
    pub client_id: String,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub client_secret_expiration_date: Option<NaiveDate>,
    /// First posting date that must be e-signed.
    #[serde(default)]
    pub signature_start_date: Option<NaiveDate>,
}

impl ConnectorConfig {
    pub fn urls(&self) -> EtaUrls {
        EtaUrls::for_environment(self.environment)
    }

    /// `None` when no expiration date is configured.
    pub fn secret_expiry(&self, today: NaiveDate) -> Option<SecretExpiry> {
        self.client_secret_expiration_date
            .map(|expiration| SecretExpiry::classify(expiration, today))
    }
}

/// Receipt credentials bound to one POS profile.
///
/// Receipts of a profile without an enabled connector are kept locally and
/// never sent.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PosConnectorConfig {
    pub pos_profile: String,
    #[serde(default)]
    pub environment: Environment,
    pub client_id: String,
    /// Sent as the `posserial` header on token requests.
    pub serial_number: String,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub client_secret_expiration_date: Option<NaiveDate>,
}

impl PosConnectorConfig {
    pub fn urls(&self) -> EtaUrls {
        EtaUrls::for_environment(self.environment)
    }

    pub fn secret_expiry(&self, today: NaiveDate) -> Option<SecretExpiry> {
        self.client_secret_expiration_date
            .map(|expiration| SecretExpiry::classify(expiration, today))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EtaSettings {
    pub database: DbConfig,
    pub logging: LoggingConfig,
    pub connectors: Vec<ConnectorConfig>,
    pub pos_connectors: Vec<PosConnectorConfig>,
}

impl EtaSettings {
    /// Reject configurations with more than one default connector per company
    /// or more than one enabled POS connector per POS profile.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen: Vec<&str> = Vec::new();
        for connector in self.connectors.iter().filter(|c| c.is_default) {
            if seen.contains(&connector.company.as_str()) {
                return Err(ConfigError::DuplicateDefault(connector.company.clone()));
            }
            seen.push(&connector.company);
        }

        let mut profiles: Vec<&str> = Vec::new();
        for connector in self.pos_connectors.iter().filter(|c| !c.disabled) {
            if profiles.contains(&connector.pos_profile.as_str()) {
                return Err(ConfigError::DuplicatePosConnector(
                    connector.pos_profile.clone(),
                ));
            }
            profiles.push(&connector.pos_profile);
        }
        Ok(())
    }

    pub fn default_connector(&self, company: &str) -> Result<&ConnectorConfig, ConfigError> {
        self.connectors
            .iter()
            .find(|c| c.is_default && c.company == company)
            .ok_or_else(|| ConfigError::NoDefaultConnector(company.to_string()))
    }

    /// The enabled connector for `pos_profile`. Disabled entries are skipped.
    pub fn pos_connector(&self, pos_profile: &str) -> Result<&PosConnectorConfig, ConfigError> {
        self.pos_connectors
            .iter()
            .find(|c| !c.disabled && c.pos_profile == pos_profile)
            .ok_or_else(|| ConfigError::NoPosConnector(pos_profile.to_string()))
    }
}
