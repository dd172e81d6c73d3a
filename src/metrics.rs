use anyhow::Result;
use metrics::{counter, gauge, histogram};
use std::time::Duration;

use crate::models::SentimentLabel;

/// Metrics collection and management
#[derive(Debug, Clone, Copy)]
pub struct MetricsCollector {
    /// Database operations, labelled by operation and status
    pub db_operations_total: &'static str,
    /// Database operation latency in seconds
    pub db_operation_duration: &'static str,
    /// Configured pool size
    pub db_connection_pool_size: &'static str,

    /// Completed import runs
    pub import_runs_total: &'static str,
    /// Import run latency in seconds
    pub import_duration: &'static str,
    /// Tables created by imports
    pub import_tables_created_total: &'static str,
    /// Rows inserted by imports
    pub import_rows_inserted_total: &'static str,
    /// Rows skipped by imports
    pub import_rows_failed_total: &'static str,
    /// SQL scripts written
    pub import_scripts_written_total: &'static str,

    /// Classifications, labelled by sentiment
    pub sentiment_classifications_total: &'static str,
    /// Neutral fallbacks, labelled by reason
    pub sentiment_fallbacks_total: &'static str,
    /// Distribution of sentiment scores
    pub sentiment_scores: &'static str,
    /// Distribution of classified text lengths
    pub sentiment_text_length: &'static str,

    /// Errors, labelled by kind and component
    pub errors_total: &'static str,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self {
            db_operations_total: "customer_desk_db_operations_total",
            db_operation_duration: "customer_desk_db_operation_duration_seconds",
            db_connection_pool_size: "customer_desk_db_connection_pool_size",

            import_runs_total: "customer_desk_import_runs_total",
            import_duration: "customer_desk_import_duration_seconds",
            import_tables_created_total: "customer_desk_import_tables_created_total",
            import_rows_inserted_total: "customer_desk_import_rows_inserted_total",
            import_rows_failed_total: "customer_desk_import_rows_failed_total",
            import_scripts_written_total: "customer_desk_import_scripts_written_total",

            sentiment_classifications_total: "customer_desk_sentiment_classifications_total",
            sentiment_fallbacks_total: "customer_desk_sentiment_fallbacks_total",
            sentiment_scores: "customer_desk_sentiment_scores",
            sentiment_text_length: "customer_desk_sentiment_text_length",

            errors_total: "customer_desk_errors_total",
        }
    }
}

impl MetricsCollector {
    /// Install the no-op recorder; callers embedding the library may install their own instead
    pub fn init() -> Result<()> {
        metrics::set_global_recorder(metrics::NoopRecorder)
            .map_err(|e| anyhow::anyhow!("Failed to initialize metrics recorder: {}", e))?;

        Ok(())
    }

    /// Record database operation metrics
    pub fn record_db_operation(&self, operation: &str, duration: Duration, success: bool) {
        let status = if success { "success" } else { "error" };

        counter!(self.db_operations_total, "operation" => operation.to_string(), "status" => status)
            .increment(1);
        histogram!(self.db_operation_duration, "operation" => operation.to_string())
            .record(duration.as_secs_f64());

        if !success {
            self.record_error("database", operation);
        }
    }

    /// Record the outcome of one spreadsheet import
    pub fn record_import(&self, tables: usize, inserted: usize, failed: usize, duration: Duration) {
        counter!(self.import_runs_total).increment(1);
        counter!(self.import_tables_created_total).increment(tables as u64);
        counter!(self.import_rows_inserted_total).increment(inserted as u64);
        counter!(self.import_rows_failed_total).increment(failed as u64);
        histogram!(self.import_duration).record(duration.as_secs_f64());
    }

    /// Record a generated SQL script
    pub fn record_script_written(&self, size_bytes: u64) {
        counter!(self.import_scripts_written_total).increment(1);
        histogram!("customer_desk_import_script_size_bytes").record(size_bytes as f64);
    }

    /// Record one sentiment classification
    pub fn record_sentiment_analysis(&self, label: SentimentLabel, score: f64, text_length: usize) {
        counter!(self.sentiment_classifications_total, "label" => label.as_str()).increment(1);
        histogram!(self.sentiment_scores, "label" => label.as_str()).record(score);
        histogram!(self.sentiment_text_length).record(text_length as f64);
    }

    /// Record a classification that fell back to neutral
    pub fn record_sentiment_fallback(&self, reason: &str) {
        counter!(self.sentiment_fallbacks_total, "reason" => reason.to_string()).increment(1);
    }

    /// Record error metrics
    pub fn record_error(&self, error_type: &str, operation: &str) {
        counter!(
            self.errors_total,
            "type" => error_type.to_string(),
            "operation" => operation.to_string()
        )
        .increment(1);
    }

    /// Update connection pool size
    pub fn update_connection_pool_size(&self, size: u32) {
        gauge!(self.db_connection_pool_size).set(f64::from(size));
    }
}

/// Times an operation and reports it as a database operation when finished
pub struct MetricsTimer {
    collector: MetricsCollector,
    operation: String,
    start: std::time::Instant,
}

impl MetricsTimer {
    /// Start timing `operation`
    #[must_use]
    pub fn new(collector: MetricsCollector, operation: &str) -> Self {
        Self {
            collector,
            operation: operation.to_string(),
            start: std::time::Instant::now(),
        }
    }

    /// Record the elapsed time and the outcome
    pub fn finish(self, success: bool) {
        let duration = self.start.elapsed();
        self.collector
            .record_db_operation(&self.operation, duration, success);
    }
}
