//! Customer Desk - Spreadsheet Import and Feedback Sentiment
//!
//! The core of a customer-service backend: turning arbitrary spreadsheets into
//! relational tables, and classifying customer messages into feedback records.
//!
//! # Features
//!
//! - Import multi-sheet workbooks (xlsx, xls, ods, csv) into SQLite
//! - Infer column types and SQL-safe names per sheet
//! - Re-emit an import as a standalone SQL script
//! - Lexicon-based Portuguese sentiment and keyword extraction
//! - Contact and feedback persistence with retention cleanup

/// Configuration management
pub mod config;
/// Database operations and connection pooling
pub mod db;
/// Error types
pub mod error;
/// SQL script and summary output
pub mod file_writer;
/// Table and column name derivation
pub mod identifier;
/// Spreadsheet import sessions
pub mod importer;
/// Column type inference and value coercion
pub mod inference;
/// Sentiment word lists
pub mod lexicon;
/// Logging setup and utilities
pub mod logging;
/// Metrics collection
pub mod metrics;
/// Data models and structures
pub mod models;
/// Sentiment classification
pub mod nlp;
/// Storage traits used by the services
pub mod repository;
/// Database schema definitions
pub mod schema;
/// Feedback and contact orchestration
pub mod service;
/// Input validation and sanitization
pub mod validation;
/// Spreadsheet reading
pub mod workbook;

// Re-export key components for easier access
pub use db::Database;
pub use error::{DeskError, Result};
pub use importer::{ImportSession, ImportSummary};
pub use lexicon::Lexicon;
pub use models::{FeedbackRecord, IncomingMessage, SentimentAnalysis, SentimentLabel};
pub use nlp::SentimentAnalyzer;
