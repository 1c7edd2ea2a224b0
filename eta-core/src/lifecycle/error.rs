use thiserror::Error;

use crate::gateway::GatewayError;

/// Coarse classification shown to operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A precondition failed; nothing was sent.
    Validation,
    /// The operation is not legal from the current state; nothing was sent.
    Conflict,
    /// The round trip to the tax authority failed.
    Gateway,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("Validation error on {document}: {message}")]
    Validation { document: String, message: String },

    #[error("Conflict on {document}: {message}")]
    Conflict { document: String, message: String },

    #[error("Conflict on {document}: another operation is already in flight")]
    InFlight { document: String },

    #[error("Gateway error on {document}: {source}")]
    Gateway {
        document: String,
        #[source]
        source: GatewayError,
    },
}

impl LifecycleError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Conflict { .. } | Self::InFlight { .. } => ErrorKind::Conflict,
            Self::Gateway { .. } => ErrorKind::Gateway,
        }
    }

    pub fn document(&self) -> &str {
        match self {
            Self::Validation { document, .. }
            | Self::Conflict { document, .. }
            | Self::InFlight { document }
            | Self::Gateway { document, .. } => document,
        }
    }

    /// Title to show above the message, when the tax authority supplied one.
    pub fn title(&self) -> Option<&str> {
        match self {
            Self::Gateway { source, .. } => source.title(),
            _ => None,
        }
    }
}
