use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::DocumentKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionState {
    Completed,
    PartiallySucceeded,
    Failed,
}

impl SubmissionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "Completed",
            Self::PartiallySucceeded => "Partially Succeeded",
            Self::Failed => "Failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Completed" => Some(Self::Completed),
            "Partially Succeeded" => Some(Self::PartiallySucceeded),
            "Failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Outcome for one document inside a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub document_id: String,
    pub external_uuid: Option<String>,
    pub accepted: bool,
    pub error: Option<String>,
}

impl LogEntry {
    pub fn accepted(document_id: &str, external_uuid: Option<String>) -> Self {
        Self {
            document_id: document_id.to_string(),
            external_uuid,
            accepted: true,
            error: None,
        }
    }

    pub fn rejected(document_id: &str, error: impl Into<String>) -> Self {
        Self {
            document_id: document_id.to_string(),
            external_uuid: None,
            accepted: false,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionLog {
    pub id: i64,
    pub kind: DocumentKind,
    pub pos_profile: Option<String>,
    pub submission_id: Option<String>,
    pub state: SubmissionState,
    pub summary: String,
    pub entries: Vec<LogEntry>,
    pub created_at: DateTime<Utc>,
}

/// For journaling a submission (no id or timestamp)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSubmissionLog {
    pub kind: DocumentKind,
    pub pos_profile: Option<String>,
    pub submission_id: Option<String>,
    pub state: SubmissionState,
    pub summary: String,
    pub entries: Vec<LogEntry>,
}

impl NewSubmissionLog {
    /// Build a log from per-document outcomes, deriving state and summary.
    pub fn from_entries(
        kind: DocumentKind,
        pos_profile: Option<String>,
        submission_id: Option<String>,
        entries: Vec<LogEntry>,
    ) -> Self {
        let total = entries.len();
        let accepted = entries.iter().filter(|e| e.accepted).count();
        let rejected = total - accepted;

        let state = if total > 0 && accepted == total {
            SubmissionState::Completed
        } else if accepted == 0 {
            SubmissionState::Failed
        } else {
            SubmissionState::PartiallySucceeded
        };

        Self {
            kind,
            pos_profile,
            submission_id,
            state,
            summary: format!(
                "Total no of documents: {total}\nTotal no of accepted: {accepted}\nTotal no of rejected: {rejected}"
            ),
            entries,
        }
    }
}
