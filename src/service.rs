use std::path::Path;
use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{DeskError, Result};
use crate::identifier::column_identifier;
use crate::metrics::{MetricsCollector, MetricsTimer};
use crate::models::{FeedbackRecord, FeedbackStats, IncomingMessage, NewContact, SentimentLabel};
use crate::nlp::SentimentAnalyzer;
use crate::repository::FeedbackStore;
use crate::validation::InputValidator;
use crate::workbook::read_workbook;

/// Cleaned headers recognised as the contact name column
const NAME_HEADERS: &[&str] = &["nome", "name", "cliente", "contato"];
/// Cleaned headers recognised as the phone column
const PHONE_HEADERS: &[&str] = &["telefone", "phone", "celular", "whatsapp"];

/// Outcome of classifying a contact's stored messages
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProcessReport {
    /// Contact name as stored
    pub contact: String,
    /// Messages found for the contact
    pub messages: usize,
    /// Feedback records written
    pub analyzed: usize,
    /// Messages without text
    pub skipped: usize,
    /// Labels assigned during this run
    pub stats: FeedbackStats,
}

/// Classifies messages and persists the resulting feedback
pub struct FeedbackService<S: FeedbackStore> {
    store: S,
    analyzer: Arc<SentimentAnalyzer>,
    metrics: MetricsCollector,
}

impl<S: FeedbackStore> FeedbackService<S> {
    /// A service writing to `store` with a shared analyzer
    pub fn new(store: S, analyzer: Arc<SentimentAnalyzer>) -> Self {
        Self {
            store,
            analyzer,
            metrics: MetricsCollector::default(),
        }
    }

    /// The underlying store
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Classify one message and upsert its feedback record
    pub fn analyze_and_store(&self, message: &IncomingMessage) -> Result<FeedbackRecord> {
        let record = self.analyzer.analyze_message(message);

        let timer = MetricsTimer::new(self.metrics, "upsert_feedback");
        let stored = self.store.upsert_feedback(&record);
        timer.finish(stored.is_ok());
        stored?;

        debug!(id = %record.id, sentiment = %record.sentiment, "Feedback stored");
        Ok(record)
    }

    /// Classify every stored message of a contact, in batches
    ///
    /// Feedback ids derive from message ids, so reprocessing a contact
    /// overwrites its earlier records instead of duplicating them.
    pub fn process_contact(&self, name: &str, batch_size: usize) -> Result<ProcessReport> {
        InputValidator::validate_contact_name(name)?;
        InputValidator::validate_batch_size(batch_size)?;

        let contact = self
            .store
            .find_contact(name)?
            .ok_or_else(|| DeskError::ContactNotFound(name.to_string()))?;
        let messages = self.store.messages_for_contact(&contact.name)?;

        let mut report = ProcessReport {
            contact: contact.name.clone(),
            messages: messages.len(),
            ..ProcessReport::default()
        };

        for (batch_index, batch) in messages.chunks(batch_size).enumerate() {
            for message in batch {
                if !message.text.as_deref().is_some_and(|t| !t.trim().is_empty()) {
                    report.skipped += 1;
                    continue;
                }

                let record = self.analyze_and_store(&message.to_incoming(contact.phone.as_deref()))?;
                match record.sentiment {
                    SentimentLabel::Positive => report.stats.positive += 1,
                    SentimentLabel::Negative => report.stats.negative += 1,
                    SentimentLabel::Neutral => report.stats.neutral += 1,
                }
                report.analyzed += 1;
            }
            debug!(batch = batch_index + 1, size = batch.len(), "Batch processed");
        }

        info!(
            contact = %report.contact,
            analyzed = report.analyzed,
            skipped = report.skipped,
            "Contact processed"
        );
        Ok(report)
    }

    /// Delete feedback analyzed more than `days` days ago
    pub fn purge_older_than(&self, days: u32) -> Result<usize> {
        InputValidator::validate_retention_days(days)?;
        let cutoff = Utc::now() - Duration::days(i64::from(days));

        let timer = MetricsTimer::new(self.metrics, "delete_feedback_before");
        let removed = self.store.delete_feedback_before(cutoff);
        timer.finish(removed.is_ok());
        removed
    }

    /// Label counts over all stored feedback
    pub fn stats(&self) -> Result<FeedbackStats> {
        self.store.feedback_stats()
    }
}

/// A contact row that was not imported
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedContact {
    /// One-based data row number
    pub row: usize,
    /// Validation error for the row
    pub reason: String,
}

/// Outcome of importing a contact spreadsheet
#[derive(Debug, Clone, Default, Serialize)]
pub struct ContactImportReport {
    /// Contacts inserted or updated
    pub imported: usize,
    /// Rows rejected by validation
    pub skipped: Vec<SkippedContact>,
}

/// Loads contacts from the first sheet of a spreadsheet
pub struct ContactImporter<'a, S: FeedbackStore> {
    store: &'a S,
}

impl<'a, S: FeedbackStore> ContactImporter<'a, S> {
    /// An importer saving into `store`
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Upsert every row with a valid name and phone
    pub fn import(&self, path: &Path) -> Result<ContactImportReport> {
        let workbook = read_workbook(path, true)?;
        let sheet = workbook.sheets.first().ok_or_else(|| DeskError::FileRead {
            path: path.to_path_buf(),
            reason: "no sheet with data rows".to_string(),
        })?;

        let find_column = |candidates: &[&str]| {
            sheet
                .headers
                .iter()
                .position(|h| candidates.contains(&column_identifier(h).as_str()))
        };
        let name_col = find_column(NAME_HEADERS).ok_or_else(|| {
            DeskError::Validation(format!("no name column (expected one of {NAME_HEADERS:?})"))
        })?;
        let phone_col = find_column(PHONE_HEADERS).ok_or_else(|| {
            DeskError::Validation(format!("no phone column (expected one of {PHONE_HEADERS:?})"))
        })?;

        let mut report = ContactImportReport::default();
        for (index, row) in sheet.rows.iter().enumerate() {
            let cell = |col: usize| row.get(col).map(ToString::to_string).unwrap_or_default();
            let name = InputValidator::sanitize_text(&cell(name_col));
            let phone = cell(phone_col);

            let checked = InputValidator::validate_contact_name(&name)
                .and_then(|()| InputValidator::validate_phone(&phone));
            if let Err(e) = checked {
                warn!(row = index + 1, error = %e, "Skipping contact row");
                report.skipped.push(SkippedContact {
                    row: index + 1,
                    reason: e.to_string(),
                });
                continue;
            }

            self.store.save_contact(NewContact {
                name,
                phone: Some(InputValidator::normalize_phone(&phone)),
                email: None,
            })?;
            report.imported += 1;
        }

        info!(
            path = %path.display(),
            imported = report.imported,
            skipped = report.skipped.len(),
            "Contacts imported"
        );
        Ok(report)
    }
}
