use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Which endpoint family a document belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Invoice,
    Receipt,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Invoice => "invoice",
            Self::Receipt => "receipt",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "invoice" | "einvoice" | "e-invoice" => Some(Self::Invoice),
            "receipt" | "ereceipt" | "e-receipt" => Some(Self::Receipt),
            _ => None,
        }
    }

    /// Receipts are addressed by point-of-sale profile as well as by id.
    pub fn requires_pos_profile(&self) -> bool {
        matches!(self, Self::Receipt)
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DocumentStatus {
    #[default]
    NotSigned,
    Signed,
    Submitted,
    Valid,
    Invalid,
    Rejected,
    Cancelled,
}

impl DocumentStatus {
    /// Statuses the tax authority itself can report, in report order.
    pub const REMOTE: [DocumentStatus; 5] = [
        Self::Submitted,
        Self::Valid,
        Self::Invalid,
        Self::Rejected,
        Self::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotSigned => "Not Signed",
            Self::Signed => "Signed",
            Self::Submitted => "Submitted",
            Self::Valid => "Valid",
            Self::Invalid => "Invalid",
            Self::Rejected => "Rejected",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Case-insensitive; the authority answers both `Valid` and `valid`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "not signed" | "notsigned" | "" => Some(Self::NotSigned),
            "signed" => Some(Self::Signed),
            "submitted" => Some(Self::Submitted),
            "valid" => Some(Self::Valid),
            "invalid" => Some(Self::Invalid),
            "rejected" => Some(Self::Rejected),
            "cancelled" | "canceled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    pub fn is_remote(&self) -> bool {
        Self::REMOTE.contains(self)
    }

    pub fn is_cancellable(&self) -> bool {
        matches!(self, Self::Valid | Self::Submitted)
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Colour of the status pill shown next to a document title.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorColor {
    Green,
    Red,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusIndicator {
    pub label: String,
    pub color: IndicatorColor,
}

/// Local cache of one invoice or receipt as known to the tax authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxDocument {
    pub document_id: String,
    pub kind: DocumentKind,
    pub pos_profile: Option<String>,

    // Reporting context
    pub company: String,
    pub posting_date: NaiveDate,
    pub grand_total: Decimal,

    // Tax authority state
    pub status: DocumentStatus,
    pub signature: Option<String>,
    pub external_uuid: Option<String>,
    pub submission_id: Option<String>,
    pub cancellation_reason: Option<String>,
}

/// For registering a business document (always starts unsigned)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTaxDocument {
    pub document_id: String,
    pub kind: DocumentKind,
    pub pos_profile: Option<String>,
    pub company: String,
    pub posting_date: NaiveDate,
    pub grand_total: Decimal,
}

impl From<NewTaxDocument> for TaxDocument {
    fn from(new: NewTaxDocument) -> Self {
        Self {
            document_id: new.document_id,
            kind: new.kind,
            pos_profile: new.pos_profile,
            company: new.company,
            posting_date: new.posting_date,
            grand_total: new.grand_total,
            status: DocumentStatus::NotSigned,
            signature: None,
            external_uuid: None,
            submission_id: None,
            cancellation_reason: None,
        }
    }
}

fn present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

impl TaxDocument {
    pub fn has_signature(&self) -> bool {
        present(&self.signature)
    }

    pub fn has_external_uuid(&self) -> bool {
        present(&self.external_uuid)
    }

    pub fn has_submission_id(&self) -> bool {
        present(&self.submission_id)
    }

    /// Key used to serialize operations on the same document.
    pub fn key(&self) -> (DocumentKind, String) {
        (self.kind, self.document_id.clone())
    }

    /// Verify the invariants every stored or returned document must hold.
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.document_id.trim().is_empty() {
            return Err("document_id is empty".to_string());
        }
        if self.has_external_uuid() && !self.has_signature() {
            return Err(format!(
                "{} has an external UUID but no signature",
                self.document_id
            ));
        }
        if !self.has_signature() && self.status != DocumentStatus::NotSigned {
            return Err(format!(
                "{} is '{}' without a signature",
                self.document_id, self.status
            ));
        }
        Ok(())
    }

    pub fn indicator(&self) -> StatusIndicator {
        match self.status {
            DocumentStatus::NotSigned => StatusIndicator {
                label: "ETA N/A".to_string(),
                color: IndicatorColor::Red,
            },
            DocumentStatus::Signed => StatusIndicator {
                label: "Signed".to_string(),
                color: IndicatorColor::Green,
            },
            status => StatusIndicator {
                label: format!("ETA {status}"),
                color: if matches!(status, DocumentStatus::Valid | DocumentStatus::Submitted) {
                    IndicatorColor::Green
                } else {
                    IndicatorColor::Red
                },
            },
        }
    }
}
