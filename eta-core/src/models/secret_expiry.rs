use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Days before expiry at which a client secret is flagged for renewal.
pub const NEAR_EXPIRY_DAYS: i64 = 60;

/// Renewal state of a connector's client secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SecretExpiry {
    Expired,
    NearExpiry { days_remaining: i64 },
    Ok { days_remaining: i64 },
}

impl SecretExpiry {
    pub fn classify(expiration: NaiveDate, today: NaiveDate) -> Self {
        let days_remaining = (expiration - today).num_days();
        if days_remaining <= 0 {
            Self::Expired
        } else if days_remaining <= NEAR_EXPIRY_DAYS {
            Self::NearExpiry { days_remaining }
        } else {
            Self::Ok { days_remaining }
        }
    }

    pub fn needs_attention(&self) -> bool {
        !matches!(self, Self::Ok { .. })
    }
}

impl std::fmt::Display for SecretExpiry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Expired => write!(f, "client secret expired, renew it from the ETA portal"),
            Self::NearExpiry { days_remaining } => {
                write!(f, "client secret will expire in {days_remaining} days")
            }
            Self::Ok { days_remaining } => write!(f, "ok ({days_remaining} days remaining)"),
        }
    }
}
