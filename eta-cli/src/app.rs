use std::fmt::Write;

use chrono::NaiveDate;
use eta_core::config::{ConnectorConfig, PosConnectorConfig};
use eta_core::gateway::EtaUrls;
use eta_core::models::SecretExpiry;
use eta_core::db::{DbConfig, RepositoryRegistry};
use eta_core::{DocumentRepository, RepositoryError, SubmissionLog, TaxDocument};
use eta_store_sqlite::SqliteRepositoryFactory;

/// Every storage backend this binary can open.
pub fn build_registry() -> RepositoryRegistry {
    let mut registry = RepositoryRegistry::new();
    registry.register(Box::new(SqliteRepositoryFactory));
    registry
}

pub async fn open_repository(
    config: &DbConfig,
) -> Result<Box<dyn DocumentRepository>, RepositoryError> {
    build_registry().create(config).await
}

fn or_dash(value: Option<&str>) -> &str {
    value.filter(|v| !v.trim().is_empty()).unwrap_or("-")
}

pub fn render_document(doc: &TaxDocument) -> String {
    let indicator = doc.indicator();
    let mut out = String::new();
    let rows = [
        ("Document", doc.document_id.as_str()),
        ("Kind", doc.kind.as_str()),
        ("Company", doc.company.as_str()),
        ("POS Profile", or_dash(doc.pos_profile.as_deref())),
        ("Status", doc.status.as_str()),
        ("Indicator", indicator.label.as_str()),
        ("UUID", or_dash(doc.external_uuid.as_deref())),
        ("Submission", or_dash(doc.submission_id.as_deref())),
        ("Signed", if doc.has_signature() { "yes" } else { "no" }),
        ("Cancel Reason", or_dash(doc.cancellation_reason.as_deref())),
    ];
    for (label, value) in rows {
        let _ = writeln!(out, "{label:<14} {value}");
    }
    let _ = writeln!(out, "{:<14} {}", "Posting Date", doc.posting_date);
    let _ = write!(out, "{:<14} {}", "Grand Total", doc.grand_total);
    out
}

pub fn render_document_table(docs: &[TaxDocument]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<8} {:<24} {:<12} {:<22} {:>14}  {}",
        "Kind", "Document", "Date", "Status", "Grand Total", "UUID"
    );
    for doc in docs {
        let _ = writeln!(
            out,
            "{:<8} {:<24} {:<12} {:<22} {:>14}  {}",
            doc.kind.as_str(),
            doc.document_id,
            doc.posting_date.to_string(),
            doc.indicator().label,
            doc.grand_total,
            or_dash(doc.external_uuid.as_deref())
        );
    }
    let _ = write!(out, "{} document(s)", docs.len());
    out
}

pub fn render_logs(logs: &[SubmissionLog]) -> String {
    let mut out = String::new();
    for log in logs {
        let _ = writeln!(
            out,
            "#{} {} {} {} [{}]",
            log.id,
            log.created_at.format("%Y-%m-%d %H:%M:%S"),
            log.kind,
            or_dash(log.submission_id.as_deref()),
            log.state.as_str()
        );
        for line in log.summary.lines() {
            let _ = writeln!(out, "    {line}");
        }
        for entry in log.entries.iter().filter(|e| !e.accepted) {
            let _ = writeln!(
                out,
                "    rejected {}: {}",
                entry.document_id,
                or_dash(entry.error.as_deref())
            );
        }
    }
    if logs.is_empty() {
        out.push_str("no submission logs\n");
    }
    out
}

pub fn render_connectors(connectors: &[ConnectorConfig], today: NaiveDate) -> String {
    let mut out = String::new();
    if connectors.is_empty() {
        out.push_str("no connectors configured\n");
        return out;
    }
    for connector in connectors {
        let _ = writeln!(
            out,
            "{}{} ({:?})",
            connector.company,
            if connector.is_default { " [default]" } else { "" },
            connector.environment
        );
        let _ = writeln!(out, "    client id:   {}", connector.client_id);
        write_endpoints(&mut out, &connector.urls(), connector.secret_expiry(today));
    }
    out
}

pub fn render_pos_connectors(connectors: &[PosConnectorConfig], today: NaiveDate) -> String {
    let mut out = String::new();
    for connector in connectors {
        let _ = writeln!(
            out,
            "POS {}{} ({:?})",
            connector.pos_profile,
            if connector.disabled { " [disabled]" } else { "" },
            connector.environment
        );
        let _ = writeln!(out, "    client id:   {}", connector.client_id);
        let _ = writeln!(out, "    serial:      {}", connector.serial_number);
        write_endpoints(&mut out, &connector.urls(), connector.secret_expiry(today));
    }
    out
}

fn write_endpoints(out: &mut String, urls: &EtaUrls, expiry: Option<SecretExpiry>) {
    let _ = writeln!(out, "    api:         {}", urls.base_api_url);
    let _ = writeln!(out, "    token:       {}", urls.id_url);
    match expiry {
        Some(expiry) if expiry.needs_attention() => {
            let _ = writeln!(out, "    secret:      {expiry} (renew the client secret)");
        }
        Some(expiry) => {
            let _ = writeln!(out, "    secret:      {expiry}");
        }
        None => {
            let _ = writeln!(out, "    secret:      expiration date not set");
        }
    }
}
