use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use tracing::{debug, info};

use eta_cli::{DocumentLoader, app, load_settings, logging};
use eta_core::db::{DbConfig, DocumentFilter};
use eta_core::report::{ReportFilter, StatusReport};
use eta_core::{DocumentKind, DocumentRepository, DocumentStatus};

// ─── CLI definition ──────────────────────────────────────────────────────────

/// Offline companion for e-invoice and e-receipt documents.
///
/// Registers host documents, inspects their tax-authority status and
/// prints the status report and submission history.
#[derive(Debug, Parser)]
#[command(name = "eta", version)]
struct Cli {
    /// Settings file. Defaults to `eta.toml` in the working directory.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database backend, overriding the settings file.
    #[arg(long, global = true)]
    backend: Option<String>,

    /// Database connection string, overriding the settings file.
    /// For SQLite this is a file path (e.g. `eta.db`) or `:memory:`.
    #[arg(long, global = true)]
    db: Option<String>,

    /// Log filter, e.g. `debug` or `eta_core=trace`. Beats `RUST_LOG`.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Register documents from a CSV file.
    Import {
        #[arg(long)]
        file: PathBuf,
    },
    /// Show one document.
    Show {
        #[arg(long, value_parser = parse_kind)]
        kind: DocumentKind,
        #[arg(long)]
        document: String,
    },
    /// List documents by posting date, oldest first.
    List {
        #[arg(long)]
        company: Option<String>,
        #[arg(long, value_parser = parse_status)]
        status: Option<DocumentStatus>,
        #[arg(long, value_parser = parse_kind)]
        kind: Option<DocumentKind>,
    },
    /// Status report for a company over a date range.
    Report {
        #[arg(long)]
        company: String,
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
    },
    /// Recent submission logs.
    Logs {
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Configured connectors with their endpoints and secret state.
    Connectors {
        /// Reference date for the expiry check. Defaults to today.
        #[arg(long)]
        today: Option<NaiveDate>,
    },
}

fn parse_kind(s: &str) -> Result<DocumentKind, String> {
    DocumentKind::parse(s).ok_or_else(|| format!("unknown document kind '{s}'"))
}

fn parse_status(s: &str) -> Result<DocumentStatus, String> {
    DocumentStatus::parse(s).ok_or_else(|| format!("unknown status '{s}'"))
}

async fn open_store(config: &DbConfig) -> anyhow::Result<Box<dyn DocumentRepository>> {
    debug!(
        backend = %config.backend,
        db = %config.connection_string,
        "opening store"
    );
    app::open_repository(config)
        .await
        .context("opening document store")
}

// ─── entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_logging();

    let cli = Cli::parse();

    let mut settings = load_settings(cli.config.as_deref()).context("loading settings")?;
    if let Some(backend) = cli.backend {
        settings.database.backend = backend;
    }
    if let Some(db) = cli.db {
        settings.database.connection_string = db;
    }

    let rust_log_set = std::env::var_os("RUST_LOG").is_some();
    if let Some(level) =
        logging::effective_level(cli.log_level.as_deref(), rust_log_set, &settings.logging.level)
    {
        logging::set_log_level(&level)?;
    }
    if let Some(file) = &settings.logging.file {
        logging::enable_file_logging(Path::new(file))?;
    }

    match cli.command {
        Command::Connectors { today } => {
            let today = today.unwrap_or_else(|| Local::now().date_naive());
            print!("{}", app::render_connectors(&settings.connectors, today));
            print!("{}", app::render_pos_connectors(&settings.pos_connectors, today));
        }
        Command::Import { file } => {
            let repo = open_store(&settings.database).await?;
            let reader = File::open(&file)
                .with_context(|| format!("cannot open '{}'", file.display()))?;
            let records = DocumentLoader::parse(reader)?;
            let summary = DocumentLoader::load(&*repo, &records).await?;
            info!(
                inserted = summary.inserted,
                skipped = summary.skipped,
                "import finished"
            );
            println!(
                "{} inserted, {} already registered",
                summary.inserted, summary.skipped
            );
        }
        Command::Show { kind, document } => {
            let repo = open_store(&settings.database).await?;
            let doc = repo.get_document(kind, &document).await?;
            println!("{}", app::render_document(&doc));
        }
        Command::List {
            company,
            status,
            kind,
        } => {
            let repo = open_store(&settings.database).await?;
            let filter = DocumentFilter {
                company,
                kind,
                status,
                ..DocumentFilter::default()
            };
            let docs = repo.list_documents(&filter).await?;
            println!("{}", app::render_document_table(&docs));
        }
        Command::Report { company, from, to } => {
            anyhow::ensure!(from <= to, "--from {from} is after --to {to}");
            let repo = open_store(&settings.database).await?;
            let signature_start_date = settings
                .default_connector(&company)
                .ok()
                .and_then(|c| c.signature_start_date);
            let filter = ReportFilter {
                company,
                from_date: from,
                to_date: to,
                signature_start_date,
            };
            let docs = repo
                .list_documents(&DocumentFilter::for_company(&filter.company).between(from, to))
                .await?;
            println!("{}", StatusReport::build(&docs, &filter));
        }
        Command::Logs { limit } => {
            let repo = open_store(&settings.database).await?;
            let logs = repo.list_logs(limit).await?;
            print!("{}", app::render_logs(&logs));
        }
    }

    Ok(())
}
