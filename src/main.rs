use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use customer_desk::config::AppConfig;
use customer_desk::db::Database;
use customer_desk::file_writer::write_summary_json;
use customer_desk::importer::{open_import_database, ImportSession, ImportSummary};
use customer_desk::lexicon::Lexicon;
use customer_desk::logging::{init_logging, OperationTimer};
use customer_desk::metrics::MetricsCollector;
use customer_desk::models::IncomingMessage;
use customer_desk::nlp::SentimentAnalyzer;
use customer_desk::service::{ContactImporter, FeedbackService};
use customer_desk::validation::InputValidator;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a spreadsheet into SQLite tables
    Import {
        /// Spreadsheet to import (xlsx, xlsm, xlsb, xls, ods or csv)
        #[arg(short, long)]
        file: PathBuf,

        /// SQLite file receiving the tables (defaults to import.database_path)
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Also write a SQL script, optionally to the given path
        #[arg(long, num_args = 0..=1)]
        script: Option<Option<PathBuf>>,

        /// Write the import summary as JSON
        #[arg(long)]
        summary: Option<PathBuf>,

        /// Only infer the schema (combine with --script)
        #[arg(long)]
        no_database: bool,
    },
    /// Classify a single message
    Analyze {
        /// Message text
        #[arg(short, long)]
        text: String,

        /// Sender's name
        #[arg(long)]
        contact_name: Option<String>,

        /// Sender's phone number
        #[arg(long)]
        contact_phone: Option<String>,

        /// Persist the feedback record
        #[arg(long)]
        store: bool,
    },
    /// Classify every stored message of a contact
    Process {
        /// Name of the contact
        #[arg(short, long)]
        name: String,

        /// Batch size for processing
        #[arg(short, long, default_value = "100")]
        batch_size: usize,

        /// Show feedback statistics
        #[arg(long)]
        stats: bool,
    },
    /// Load contacts from a spreadsheet
    Contacts {
        /// Spreadsheet with name and phone columns
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Delete old feedback records
    Purge {
        /// Keep feedback analyzed in the last N days
        #[arg(short, long)]
        days: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = AppConfig::load()?;

    // Keep the guard alive so file logs are flushed on exit
    let _log_guard = init_logging(&config.logging)?;

    if let Err(e) = MetricsCollector::init() {
        warn!(error = %e, "Metrics recorder not installed");
    }

    info!("Starting customer-desk");

    match cli.command {
        Commands::Import {
            file,
            database,
            script,
            summary,
            no_database,
        } => run_import(&config, file, database, script, summary, no_database).await?,
        Commands::Analyze {
            text,
            contact_name,
            contact_phone,
            store,
        } => analyze_text(&config, text, contact_name, contact_phone, store).await?,
        Commands::Process {
            name,
            batch_size,
            stats,
        } => process_contact(&config, name, batch_size, stats).await?,
        Commands::Contacts { file } => import_contacts(&config, file).await?,
        Commands::Purge { days } => purge_feedback(&config, days).await?,
    }

    Ok(())
}

/// Import a spreadsheet, optionally writing the SQL script and summary
async fn run_import(
    config: &AppConfig,
    file: PathBuf,
    database: Option<PathBuf>,
    script: Option<Option<PathBuf>>,
    summary_path: Option<PathBuf>,
    no_database: bool,
) -> Result<()> {
    InputValidator::validate_spreadsheet_path(&file)?;
    if let Some(Some(path)) = &script {
        InputValidator::validate_script_path(path)?;
    }
    if no_database && script.is_none() && summary_path.is_none() {
        warn!("--no-database without --script or --summary produces no output");
    }

    let import_config = config.import.clone();
    let database_path = database.unwrap_or_else(|| PathBuf::from(&import_config.database_path));
    let script_path = script.map(|path| {
        path.unwrap_or_else(|| {
            Path::new(&import_config.output_directory).join(default_script_name(&file))
        })
    });

    let timer = OperationTimer::new("import");
    let summary = tokio::task::spawn_blocking(move || -> Result<ImportSummary> {
        let mut builder = ImportSession::builder(&file).config(&import_config);
        if !no_database {
            builder = builder.database(open_import_database(&database_path)?);
        }
        let mut session = builder.build()?;

        let summary = if no_database {
            session.summary()
        } else {
            session.run()?
        };

        if let Some(path) = script_path {
            // The database is already materialized; a script failure is reported only
            match session.generate_sql_script(Some(&path)) {
                Ok(path) => info!(path = %path.display(), "SQL script written"),
                Err(e) => warn!(error = %e, "SQL script not written"),
            }
        }

        Ok(summary)
    })
    .await
    .context("Import task failed")??;
    timer.finish();

    for (table, entry) in &summary.tables {
        info!(
            table = %table,
            sheet = %entry.original_name,
            rows = entry.row_count,
            columns = entry.column_count,
            inserted = entry.inserted_rows,
            failed = entry.failed_rows,
            "Table imported"
        );
    }
    for error in &summary.sheet_errors {
        warn!(sheet = %error.sheet, reason = %error.reason, "Sheet skipped");
    }
    if summary.is_degraded() {
        warn!(
            failed_rows = summary.failed_rows(),
            skipped_sheets = summary.sheet_errors.len(),
            "Import finished with errors"
        );
    }

    if let Some(path) = summary_path {
        write_summary_json(&summary, &path)?;
        info!(path = %path.display(), "Summary written");
    }

    info!(tables = summary.table_count, "Import complete!");
    Ok(())
}

/// Classify one text and print the feedback record as JSON
async fn analyze_text(
    config: &AppConfig,
    text: String,
    contact_name: Option<String>,
    contact_phone: Option<String>,
    store: bool,
) -> Result<()> {
    if let Some(phone) = &contact_phone {
        InputValidator::validate_phone(phone)?;
    }

    let message = IncomingMessage {
        text: InputValidator::sanitize_text(&text),
        contact_name,
        contact_phone,
        ..IncomingMessage::default()
    };
    let analyzer = build_analyzer(config)?;

    let record = if store {
        let db = open_database(config)?;
        let service = FeedbackService::new(db, analyzer);
        tokio::task::spawn_blocking(move || service.analyze_and_store(&message))
            .await
            .context("Analysis task failed")??
    } else {
        analyzer.analyze_message(&message)
    };

    emit_json(&record)?;
    Ok(())
}

/// Classify a contact's stored messages
async fn process_contact(
    config: &AppConfig,
    name: String,
    batch_size: usize,
    show_stats: bool,
) -> Result<()> {
    let db = open_database(config)?;
    let service = FeedbackService::new(db, build_analyzer(config)?);

    let timer = OperationTimer::new("process_contact");
    let (report, stats) = tokio::task::spawn_blocking(move || -> Result<_> {
        let report = service.process_contact(&name, batch_size)?;
        let stats = if show_stats {
            Some(service.stats()?)
        } else {
            None
        };
        Ok((report, stats))
    })
    .await
    .context("Processing task failed")??;
    timer.finish();

    info!(
        contact = %report.contact,
        messages = report.messages,
        analyzed = report.analyzed,
        skipped = report.skipped,
        positive = report.stats.positive,
        negative = report.stats.negative,
        neutral = report.stats.neutral,
        "Processing complete!"
    );

    if let Some(stats) = stats {
        info!("Feedback Statistics:");
        info!("Total feedback records: {}", stats.total());
        info!(
            "Positive: {}, Negative: {}, Neutral: {}",
            stats.positive, stats.negative, stats.neutral
        );
    }

    Ok(())
}

/// Upsert contacts listed in a spreadsheet
async fn import_contacts(config: &AppConfig, file: PathBuf) -> Result<()> {
    InputValidator::validate_spreadsheet_path(&file)?;
    let db = open_database(config)?;

    let report = tokio::task::spawn_blocking(move || ContactImporter::new(&db).import(&file))
        .await
        .context("Contact import task failed")??;

    for skipped in &report.skipped {
        warn!(row = skipped.row, reason = %skipped.reason, "Contact row skipped");
    }
    info!(
        imported = report.imported,
        skipped = report.skipped.len(),
        "Contacts imported"
    );
    Ok(())
}

/// Delete feedback older than the retention period
async fn purge_feedback(config: &AppConfig, days: u32) -> Result<()> {
    let db = open_database(config)?;
    let service = FeedbackService::new(db, build_analyzer(config)?);

    let removed = tokio::task::spawn_blocking(move || service.purge_older_than(days))
        .await
        .context("Purge task failed")??;

    info!(removed, days, "Purge complete!");
    Ok(())
}

fn open_database(config: &AppConfig) -> Result<Database> {
    let url = config.get_database_url();
    InputValidator::validate_database_url(&url)?;

    let db = Database::with_config(&config.database, &url)
        .with_context(|| format!("Failed to open database {url}"))?;
    MetricsCollector::default().update_connection_pool_size(config.database.max_connections);
    Ok(db)
}

fn build_analyzer(config: &AppConfig) -> Result<Arc<SentimentAnalyzer>> {
    let analyzer = SentimentAnalyzer::new(Arc::new(Lexicon::portuguese()), config.sentiment.clone())?;
    Ok(Arc::new(analyzer))
}

/// `<stem>.sql` for the given spreadsheet
fn default_script_name(file: &Path) -> String {
    let stem = file
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "import".to_string());
    format!("{stem}.sql")
}

#[allow(clippy::print_stdout)]
fn emit_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
