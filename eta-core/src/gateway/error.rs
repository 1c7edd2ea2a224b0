use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One entry of the `details` array in an authority error object.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RemoteErrorDetail {
    pub code: Option<String>,
    pub message: Option<String>,
    pub target: Option<String>,
    pub property_path: Option<String>,
}

/// Error payload returned by the tax authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteError {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default = "default_message")]
    pub message: String,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub details: Vec<RemoteErrorDetail>,
}

fn default_message() -> String {
    "No error message provided".to_string()
}

impl RemoteError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            title: None,
            message: message.into(),
            target: None,
            details: Vec::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Parse the JSON error object attached to a rejected document.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Multi-line rendering suitable for an operator dialog.
    pub fn describe(&self) -> String {
        let mut out = format!(
            "Error Message: {}\nTarget: {}\n",
            self.message,
            self.target.as_deref().unwrap_or("N/A")
        );
        for detail in &self.details {
            out.push_str(&format!(
                "\nDetail:\n  Code: {}\n  Message: {}\n  Target: {}\n  Property Path: {}\n",
                detail.code.as_deref().unwrap_or("N/A"),
                detail.message.as_deref().unwrap_or("No message provided"),
                detail.target.as_deref().unwrap_or("N/A"),
                detail.property_path.as_deref().unwrap_or("N/A"),
            ));
        }
        out
    }
}

impl std::fmt::Display for RemoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.title {
            Some(title) => write!(f, "{title}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Tax authority error: {0}")]
    Remote(RemoteError),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl GatewayError {
    /// Remote-supplied title, when the authority sent one.
    pub fn title(&self) -> Option<&str> {
        match self {
            Self::Remote(remote) => remote.title.as_deref(),
            _ => None,
        }
    }
}
