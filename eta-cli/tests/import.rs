use std::fs::File;

use eta_cli::app::open_repository;
use eta_cli::{DocumentLoader, DocumentLoaderError, LoadSummary};
use eta_core::db::{DbConfig, DocumentFilter};
use eta_core::{DocumentKind, DocumentRepository, DocumentStatus};
use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;

fn memory_db() -> DbConfig {
    DbConfig::in_memory("sqlite")
}

fn sample() -> File {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/test-data/documents.csv");
    File::open(path).expect("Failed to open test CSV")
}

#[tokio::test]
async fn import_registers_every_row_as_not_signed() {
    let repo = open_repository(&memory_db()).await.unwrap();
    let records = DocumentLoader::parse(sample()).unwrap();

    let summary = DocumentLoader::load(&*repo, &records).await.unwrap();
    assert_eq!(summary, LoadSummary { inserted: 6, skipped: 0 });

    let axentor = repo
        .list_documents(&DocumentFilter::for_company("Axentor"))
        .await
        .unwrap();
    assert_eq!(axentor.len(), 5);
    assert!(axentor.iter().all(|d| d.status == DocumentStatus::NotSigned));

    let receipt = repo
        .get_document(DocumentKind::Receipt, "ACC-PSINV-2026-00001")
        .await
        .unwrap();
    assert_eq!(receipt.pos_profile.as_deref(), Some("Main POS"));
    assert_eq!(receipt.grand_total, dec!(57.50));
}

#[tokio::test]
async fn reimport_skips_registered_documents() {
    let repo = open_repository(&memory_db()).await.unwrap();
    let records = DocumentLoader::parse(sample()).unwrap();

    DocumentLoader::load(&*repo, &records).await.unwrap();
    let again = DocumentLoader::load(&*repo, &records).await.unwrap();
    assert_eq!(again, LoadSummary { inserted: 0, skipped: 6 });
}

#[tokio::test]
async fn invalid_row_writes_nothing() {
    let repo = open_repository(&memory_db()).await.unwrap();
    let csv = "\
document_id,kind,pos_profile,company,posting_date,grand_total
SINV-1,invoice,,Axentor,2026-09-01,10.00
SINV-2,debit-note,,Axentor,2026-09-01,20.00
";
    let records = DocumentLoader::parse(csv.as_bytes()).unwrap();

    let err = DocumentLoader::load(&*repo, &records).await.unwrap_err();
    assert!(matches!(err, DocumentLoaderError::InvalidKind { line: 3, .. }));

    let all = repo.list_documents(&DocumentFilter::default()).await.unwrap();
    assert!(all.is_empty());
}

#[tokio::test]
async fn blank_document_id_is_rejected() {
    let repo = open_repository(&memory_db()).await.unwrap();
    let csv = "\
document_id,kind,pos_profile,company,posting_date,grand_total
,invoice,,Axentor,2026-09-01,10.00
";
    let records = DocumentLoader::parse(csv.as_bytes()).unwrap();

    let err = DocumentLoader::load(&*repo, &records).await.unwrap_err();
    assert!(matches!(err, DocumentLoaderError::MissingDocumentId(2)));
}

#[tokio::test]
async fn unknown_backend_is_reported() {
    let config = DbConfig {
        backend: "postgres".to_string(),
        connection_string: String::new(),
    };
    let err = open_repository(&config).await.err().unwrap();
    assert!(err.to_string().contains("available: [\"sqlite\"]"));
}
