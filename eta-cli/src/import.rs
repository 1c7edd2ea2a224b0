use std::io::Read;

use chrono::NaiveDate;
use eta_core::{DocumentKind, DocumentRepository, NewTaxDocument, RepositoryError};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors that can occur when importing documents.
#[derive(Debug, Error)]
pub enum DocumentLoaderError {
    #[error("CSV parse error: {0}")]
    CsvParse(String),

    #[error("Invalid document kind '{kind}' on line {line}")]
    InvalidKind { line: usize, kind: String },

    #[error("Empty document id on line {0}")]
    MissingDocumentId(usize),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<csv::Error> for DocumentLoaderError {
    fn from(err: csv::Error) -> Self {
        DocumentLoaderError::CsvParse(err.to_string())
    }
}

/// A single row of the documents CSV file.
///
/// - `document_id`: host identifier (e.g. `ACC-SINV-2026-00001`)
/// - `kind`: `invoice` or `receipt`
/// - `pos_profile`: point-of-sale profile; required later for receipts
/// - `company`, `posting_date` (`YYYY-MM-DD`), `grand_total`
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DocumentRecord {
    pub document_id: String,
    pub kind: String,
    #[serde(default)]
    pub pos_profile: Option<String>,
    pub company: String,
    pub posting_date: NaiveDate,
    pub grand_total: Decimal,
}

impl DocumentRecord {
    /// `line` is 1-based and counts the header, matching what editors show.
    fn to_new_document(&self, line: usize) -> Result<NewTaxDocument, DocumentLoaderError> {
        let document_id = self.document_id.trim();
        if document_id.is_empty() {
            return Err(DocumentLoaderError::MissingDocumentId(line));
        }
        let kind = DocumentKind::parse(&self.kind).ok_or_else(|| DocumentLoaderError::InvalidKind {
            line,
            kind: self.kind.clone(),
        })?;
        let pos_profile = self
            .pos_profile
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string);
        if kind.requires_pos_profile() && pos_profile.is_none() {
            warn!(document = document_id, line, "receipt has no point-of-sale profile");
        }

        Ok(NewTaxDocument {
            document_id: document_id.to_string(),
            kind,
            pos_profile,
            company: self.company.trim().to_string(),
            posting_date: self.posting_date,
            grand_total: self.grand_total,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub inserted: usize,
    /// Already registered; left untouched.
    pub skipped: usize,
}

/// Registers documents from CSV through any [`DocumentRepository`].
pub struct DocumentLoader;

impl DocumentLoader {
    pub fn parse<R: Read>(reader: R) -> Result<Vec<DocumentRecord>, DocumentLoaderError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut records = Vec::new();

        for result in csv_reader.deserialize() {
            let record: DocumentRecord = result?;
            records.push(record);
        }

        Ok(records)
    }

    /// Validate every record, then insert them. Nothing is written when any
    /// record is invalid. Documents that already exist are skipped, so an
    /// import can be re-run safely.
    pub async fn load<R>(
        repo: &R,
        records: &[DocumentRecord],
    ) -> Result<LoadSummary, DocumentLoaderError>
    where
        R: DocumentRepository + ?Sized,
    {
        let documents = records
            .iter()
            .enumerate()
            .map(|(i, record)| record.to_new_document(i + 2))
            .collect::<Result<Vec<_>, _>>()?;

        let mut summary = LoadSummary::default();
        for doc in documents {
            let id = doc.document_id.clone();
            match repo.insert_document(doc).await {
                Ok(_) => summary.inserted += 1,
                Err(RepositoryError::AlreadyExists(_)) => {
                    debug!(document = %id, "already registered, skipping");
                    summary.skipped += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    const CSV: &str = "\
document_id,kind,pos_profile,company,posting_date,grand_total
SINV-1,invoice,,Axentor,2026-05-01,1140.00
RCPT-1,Receipt, Main POS ,Axentor,2026-05-02,57.50
";

    #[test]
    fn parses_rows_with_optional_pos_profile() {
        let records = DocumentLoader::parse(CSV.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].pos_profile, None);
        assert_eq!(records[1].grand_total, dec!(57.50));
        assert_eq!(
            records[1].posting_date,
            NaiveDate::from_ymd_opt(2026, 5, 2).unwrap()
        );
    }

    #[test]
    fn record_converts_to_new_document() {
        let records = DocumentLoader::parse(CSV.as_bytes()).unwrap();
        let receipt = records[1].to_new_document(3).unwrap();
        assert_eq!(receipt.kind, DocumentKind::Receipt);
        assert_eq!(receipt.pos_profile.as_deref(), Some("Main POS"));
    }

    #[test]
    fn unknown_kind_names_the_line() {
        let csv = "document_id,kind,pos_profile,company,posting_date,grand_total\n\
                   X-1,credit-note,,Axentor,2026-05-01,1\n";
        let records = DocumentLoader::parse(csv.as_bytes()).unwrap();
        let err = records[0].to_new_document(2).unwrap_err();
        assert_eq!(err.to_string(), "Invalid document kind 'credit-note' on line 2");
    }

    #[test]
    fn bad_amount_is_a_csv_error() {
        let csv = "document_id,kind,pos_profile,company,posting_date,grand_total\n\
                   X-1,invoice,,Axentor,2026-05-01,lots\n";
        assert!(matches!(
            DocumentLoader::parse(csv.as_bytes()),
            Err(DocumentLoaderError::CsvParse(_))
        ));
    }
}
