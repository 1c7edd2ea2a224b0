use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use eta_core::db::DocumentFilter;
use eta_core::{
    DocumentKind, DocumentRepository, DocumentStatus, LogEntry, NewSubmissionLog, NewTaxDocument,
    RepositoryError, SubmissionLog, SubmissionState, TaxDocument,
};
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use tracing::debug;

use crate::decimal::{decimal_to_text, get_decimal};

const DOCUMENT_COLUMNS: &str = "kind, document_id, pos_profile, company, posting_date, grand_total,
     status, signature, external_uuid, submission_id, cancellation_reason";

pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Open a database file (created when missing), or `:memory:`.
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("Invalid database location: {}", database_url))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool_options = if database_url.contains(":memory:") {
            // Every connection would otherwise see its own empty database.
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
        } else {
            SqlitePoolOptions::new()
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to connect to database: {}", database_url))?;
        Ok(Self { pool })
    }

    /// Wrap an existing pool; migrations are left to the caller.
    pub fn new_with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    async fn load_entries(&self, log_id: i64) -> Result<Vec<LogEntry>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT document_id, external_uuid, accepted, error
             FROM submission_log_entries WHERE log_id = ? ORDER BY position",
        )
        .bind(log_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        rows.iter()
            .map(|row| {
                Ok(LogEntry {
                    document_id: get(row, "document_id")?,
                    external_uuid: get(row, "external_uuid")?,
                    accepted: get(row, "accepted")?,
                    error: get(row, "error")?,
                })
            })
            .collect()
    }

    /// Attach the per-document entries to a log read by [`row_to_log`].
    async fn with_entries(&self, mut log: SubmissionLog) -> Result<SubmissionLog, RepositoryError> {
        log.entries = self.load_entries(log.id).await?;
        Ok(log)
    }
}

fn get<'r, T>(row: &'r SqliteRow, column: &str) -> Result<T, RepositoryError>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(column)
        .map_err(|e| RepositoryError::Database(e.to_string()))
}

fn parse_kind(value: &str) -> Result<DocumentKind, RepositoryError> {
    DocumentKind::parse(value)
        .ok_or_else(|| RepositoryError::Database(format!("Invalid document kind: {}", value)))
}

/// Log header only; entries live in their own table.
fn row_to_log(row: &SqliteRow) -> Result<SubmissionLog, RepositoryError> {
    let kind: String = get(row, "kind")?;
    let state: String = get(row, "state")?;

    Ok(SubmissionLog {
        id: get(row, "id")?,
        kind: parse_kind(&kind)?,
        pos_profile: get(row, "pos_profile")?,
        submission_id: get(row, "submission_id")?,
        state: SubmissionState::parse(&state).ok_or_else(|| {
            RepositoryError::Database(format!("Invalid submission state: {}", state))
        })?,
        summary: get(row, "summary")?,
        entries: Vec::new(),
        created_at: row
            .try_get::<DateTime<Utc>, _>("created_at")
            .map_err(|e| RepositoryError::Database(format!("Failed to get created_at: {}", e)))?,
    })
}

fn row_to_document(row: &SqliteRow) -> Result<TaxDocument, RepositoryError> {
    let kind: String = get(row, "kind")?;
    let status: String = get(row, "status")?;

    let doc = TaxDocument {
        document_id: get(row, "document_id")?,
        kind: parse_kind(&kind)?,
        pos_profile: get(row, "pos_profile")?,
        company: get(row, "company")?,
        posting_date: row
            .try_get::<NaiveDate, _>("posting_date")
            .map_err(|e| RepositoryError::Database(format!("Failed to get posting_date: {}", e)))?,
        grand_total: get_decimal(row, "grand_total")?,
        status: DocumentStatus::parse(&status)
            .ok_or_else(|| RepositoryError::Database(format!("Invalid status: {}", status)))?,
        signature: get(row, "signature")?,
        external_uuid: get(row, "external_uuid")?,
        submission_id: get(row, "submission_id")?,
        cancellation_reason: get(row, "cancellation_reason")?,
    };
    doc.check_invariants().map_err(|message| {
        RepositoryError::Database(format!("Inconsistent row for {} {}: {}", doc.kind, doc.document_id, message))
    })?;
    Ok(doc)
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

#[async_trait]
impl DocumentRepository for SqliteRepository {
    async fn insert_document(&self, doc: NewTaxDocument) -> Result<TaxDocument, RepositoryError> {
        let doc: TaxDocument = doc.into();

        sqlx::query(
            "INSERT INTO tax_documents (
                kind, document_id, pos_profile, company, posting_date, grand_total, status
            ) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(doc.kind.as_str())
        .bind(&doc.document_id)
        .bind(&doc.pos_profile)
        .bind(&doc.company)
        .bind(doc.posting_date)
        .bind(decimal_to_text(doc.grand_total))
        .bind(doc.status.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                RepositoryError::AlreadyExists(format!("{} {}", doc.kind, doc.document_id))
            } else {
                RepositoryError::Database(e.to_string())
            }
        })?;

        debug!(document = %doc.document_id, kind = %doc.kind, "document registered");
        Ok(doc)
    }

    async fn get_document(
        &self,
        kind: DocumentKind,
        document_id: &str,
    ) -> Result<TaxDocument, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM tax_documents WHERE kind = ? AND document_id = ?"
        ))
        .bind(kind.as_str())
        .bind(document_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?
        .ok_or(RepositoryError::NotFound)?;

        row_to_document(&row)
    }

    async fn update_document(&self, doc: &TaxDocument) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE tax_documents SET
                status = ?, signature = ?, external_uuid = ?, submission_id = ?,
                cancellation_reason = ?, updated_at = ?
             WHERE kind = ? AND document_id = ?",
        )
        .bind(doc.status.as_str())
        .bind(&doc.signature)
        .bind(&doc.external_uuid)
        .bind(&doc.submission_id)
        .bind(&doc.cancellation_reason)
        .bind(Utc::now())
        .bind(doc.kind.as_str())
        .bind(&doc.document_id)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn retire_document(
        &self,
        kind: DocumentKind,
        document_id: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM tax_documents WHERE kind = ? AND document_id = ?")
            .bind(kind.as_str())
            .bind(document_id)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn list_documents(
        &self,
        filter: &DocumentFilter,
    ) -> Result<Vec<TaxDocument>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM tax_documents
             WHERE (?1 IS NULL OR company = ?1)
               AND (?2 IS NULL OR kind = ?2)
               AND (?3 IS NULL OR status = ?3)
               AND (?4 IS NULL OR posting_date >= ?4)
               AND (?5 IS NULL OR posting_date <= ?5)
             ORDER BY posting_date, document_id"
        ))
        .bind(&filter.company)
        .bind(filter.kind.map(|k| k.as_str()))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.from_date)
        .bind(filter.to_date)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        rows.iter().map(row_to_document).collect()
    }

    async fn insert_log(&self, log: NewSubmissionLog) -> Result<SubmissionLog, RepositoryError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        let id = sqlx::query(
            "INSERT INTO submission_logs (kind, pos_profile, submission_id, state, summary, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(log.kind.as_str())
        .bind(&log.pos_profile)
        .bind(&log.submission_id)
        .bind(log.state.as_str())
        .bind(&log.summary)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?
        .last_insert_rowid();

        for (position, entry) in log.entries.iter().enumerate() {
            sqlx::query(
                "INSERT INTO submission_log_entries
                    (log_id, position, document_id, external_uuid, accepted, error)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(id)
            .bind(position as i64)
            .bind(&entry.document_id)
            .bind(&entry.external_uuid)
            .bind(entry.accepted)
            .bind(&entry.error)
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        self.get_log(id).await
    }

    async fn get_log(&self, id: i64) -> Result<SubmissionLog, RepositoryError> {
        let log = {
            let row = sqlx::query(
                "SELECT id, kind, pos_profile, submission_id, state, summary, created_at
                 FROM submission_logs WHERE id = ?",
            )
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?
            .ok_or(RepositoryError::NotFound)?;
            row_to_log(&row)?
        };

        self.with_entries(log).await
    }

    async fn list_logs(&self, limit: Option<u32>) -> Result<Vec<SubmissionLog>, RepositoryError> {
        // SQLite treats a negative LIMIT as unbounded.
        let headers = {
            let rows = sqlx::query(
                "SELECT id, kind, pos_profile, submission_id, state, summary, created_at
                 FROM submission_logs ORDER BY id DESC LIMIT ?",
            )
            .bind(limit.map(i64::from).unwrap_or(-1))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
            rows.iter().map(row_to_log).collect::<Result<Vec<_>, _>>()?
        };

        let mut logs = Vec::with_capacity(headers.len());
        for log in headers {
            logs.push(self.with_entries(log).await?);
        }
        Ok(logs)
    }
}
