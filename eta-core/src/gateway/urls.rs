use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Environment {
    #[serde(alias = "production", alias = "prod")]
    Production,
    #[default]
    #[serde(alias = "preproduction", alias = "preprod")]
    Preproduction,
}

impl Environment {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Some(Self::Production),
            "preproduction" | "preprod" => Some(Self::Preproduction),
            _ => None,
        }
    }
}

/// Published endpoint layout of the tax authority for one environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EtaUrls {
    pub base_api_url: String,
    pub id_url: String,
    pub document_submission: String,
    pub receipt_submission: String,
    pub document_types: String,
}

impl EtaUrls {
    pub fn for_environment(environment: Environment) -> Self {
        let (base, id_url) = match environment {
            Environment::Production => (
                "https://api.invoicing.eta.gov.eg/api/v1",
                "https://id.eta.gov.eg/connect/token",
            ),
            Environment::Preproduction => (
                "https://api.preprod.invoicing.eta.gov.eg/api/v1",
                "https://id.preprod.eta.gov.eg/connect/token",
            ),
        };

        Self {
            base_api_url: base.to_string(),
            id_url: id_url.to_string(),
            document_submission: format!("{base}/documentsubmissions"),
            receipt_submission: format!("{base}/receiptsubmissions"),
            document_types: format!("{base}/documenttypes"),
        }
    }

    pub fn document_pdf_url(&self, uuid: &str) -> String {
        format!("{}/documents/{uuid}/pdf", self.base_api_url)
    }

    pub fn document_raw_url(&self, uuid: &str) -> String {
        format!("{}/documents/{uuid}/raw", self.base_api_url)
    }

    pub fn submission_url(&self, submission_id: &str) -> String {
        format!("{}/documentSubmissions/{submission_id}", self.base_api_url)
    }
}
