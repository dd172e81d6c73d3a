use std::fs;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info};

use crate::config::DatabaseConfig;
use crate::error::{DeskError, Result};
use crate::models::{
    DbContact, DbMessage, FeedbackRecord, FeedbackStats, NewContact, NewMessage, SentimentLabel,
};
use crate::schema::{contacts, feedback, messages};

/// Pool of SQLite connections
pub type DbPool = Pool<SqliteConnectionManager>;
/// A connection checked out of the pool
pub type DbConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Database manager for contacts, messages and feedback
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
}

/// Strip the `sqlite:` / `sqlite://` scheme from a database URL
#[must_use]
pub fn database_path_from_url(database_url: &str) -> &str {
    database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))
        .unwrap_or(database_url)
}

impl Database {
    /// Create a new database connection pool with default pool settings
    pub fn new(database_url: &str) -> Result<Self> {
        Self::open(database_url, Pool::builder())
    }

    /// Create a new database connection pool sized from configuration
    pub fn with_config(config: &DatabaseConfig, database_url: &str) -> Result<Self> {
        let builder = Pool::builder()
            .max_size(config.max_connections)
            .connection_timeout(Duration::from_secs(config.connection_timeout_secs));
        Self::open(database_url, builder)
    }

    fn open(
        database_url: &str,
        builder: r2d2::Builder<SqliteConnectionManager>,
    ) -> Result<Self> {
        let path = database_path_from_url(database_url);

        // Create parent directory if it doesn't exist
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let manager = SqliteConnectionManager::file(path)
            .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
        let pool = builder.build(manager)?;

        let conn = pool.get()?;
        Self::run_migrations(&conn)?;
        info!(path, "Database ready");

        Ok(Self { pool })
    }

    /// Run database migrations
    fn run_migrations(conn: &Connection) -> Result<()> {
        conn.execute_batch(include_str!(
            "../migrations/2026-09-01-000000_create_tables/up.sql"
        ))?;
        conn.execute_batch(include_str!(
            "../migrations/2026-09-08-000000_add_feedback/up.sql"
        ))?;
        Ok(())
    }

    /// Get a connection from the pool
    pub fn get_connection(&self) -> Result<DbConnection> {
        Ok(self.pool.get()?)
    }

    /// Add a new contact or update the phone/email of an existing one
    pub fn add_or_update_contact(&self, new_contact: NewContact) -> Result<DbContact> {
        let conn = self.get_connection()?;

        let existing = conn
            .query_row(
                &format!("SELECT * FROM {} WHERE {} = ?", contacts::TABLE, contacts::NAME),
                params![new_contact.name],
                Self::map_db_contact,
            )
            .optional()?;

        if let Some(contact) = existing {
            let mut update_fields = Vec::new();
            let mut update_params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

            if let Some(phone) = &new_contact.phone {
                if contact.phone.as_ref() != Some(phone) {
                    update_fields.push(format!("{} = ?", contacts::PHONE));
                    update_params.push(Box::new(phone.clone()));
                }
            }

            if let Some(email) = &new_contact.email {
                if contact.email.as_ref() != Some(email) {
                    update_fields.push(format!("{} = ?", contacts::EMAIL));
                    update_params.push(Box::new(email.clone()));
                }
            }

            if update_fields.is_empty() {
                return Ok(contact);
            }

            update_params.push(Box::new(contact.id));
            let query = format!(
                "UPDATE {} SET {} WHERE {} = ?",
                contacts::TABLE,
                update_fields.join(", "),
                contacts::ID
            );
            conn.execute(&query, rusqlite::params_from_iter(update_params.iter()))?;
            debug!(name = %new_contact.name, "Updated contact");
        } else {
            conn.execute(
                &format!(
                    "INSERT INTO {} ({}, {}, {}) VALUES (?, ?, ?)",
                    contacts::TABLE,
                    contacts::NAME,
                    contacts::PHONE,
                    contacts::EMAIL
                ),
                params![new_contact.name, new_contact.phone, new_contact.email],
            )?;
            debug!(name = %new_contact.name, "Inserted contact");
        }

        self.get_contact(&new_contact.name)?
            .ok_or_else(|| DeskError::ContactNotFound(new_contact.name.clone()))
    }

    /// Get a contact by name
    pub fn get_contact(&self, name: &str) -> Result<Option<DbContact>> {
        let conn = self.get_connection()?;

        let contact = conn
            .query_row(
                &format!("SELECT * FROM {} WHERE {} = ?", contacts::TABLE, contacts::NAME),
                params![name],
                Self::map_db_contact,
            )
            .optional()?;

        Ok(contact)
    }

    /// Get a contact by phone number
    pub fn get_contact_by_phone(&self, phone: &str) -> Result<Option<DbContact>> {
        let conn = self.get_connection()?;

        let contact = conn
            .query_row(
                &format!("SELECT * FROM {} WHERE {} = ?", contacts::TABLE, contacts::PHONE),
                params![phone],
                Self::map_db_contact,
            )
            .optional()?;

        Ok(contact)
    }

    /// List all contacts ordered by name
    pub fn list_contacts(&self) -> Result<Vec<DbContact>> {
        let conn = self.get_connection()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT * FROM {} ORDER BY {} ASC",
            contacts::TABLE,
            contacts::NAME
        ))?;
        let rows = stmt.query_map([], Self::map_db_contact)?;

        let mut results = Vec::new();
        for contact in rows {
            results.push(contact?);
        }
        Ok(results)
    }

    /// Add a new message to the database if it doesn't already exist
    pub fn add_message(&self, new_message: NewMessage) -> Result<DbMessage> {
        let conn = self.get_connection()?;

        let existing = conn
            .query_row(
                &format!(
                    "SELECT * FROM {} WHERE {} = ?",
                    messages::TABLE,
                    messages::EXTERNAL_ID
                ),
                params![new_message.external_id],
                Self::map_db_message,
            )
            .optional()?;

        if let Some(message) = existing {
            return Ok(message);
        }

        let date_imported = new_message
            .date_imported
            .unwrap_or_else(|| Utc::now().naive_utc());

        conn.execute(
            &format!(
                "INSERT INTO {} ({}, {}, {}, {}, {}, {}, {}) VALUES (?, ?, ?, ?, ?, ?, ?)",
                messages::TABLE,
                messages::EXTERNAL_ID,
                messages::CONTACT_ID,
                messages::SENDER,
                messages::TEXT,
                messages::IS_FROM_ME,
                messages::DATE_CREATED,
                messages::DATE_IMPORTED
            ),
            params![
                new_message.external_id,
                new_message.contact_id,
                new_message.sender,
                new_message.text,
                new_message.is_from_me,
                new_message.date_created,
                date_imported
            ],
        )?;

        let id = conn.last_insert_rowid();

        Ok(DbMessage {
            id,
            external_id: new_message.external_id,
            contact_id: new_message.contact_id,
            sender: new_message.sender,
            text: new_message.text,
            is_from_me: new_message.is_from_me,
            date_created: new_message.date_created,
            date_imported,
        })
    }

    /// Get a message by ID
    pub fn get_message_by_id(&self, message_id: i64) -> Result<Option<DbMessage>> {
        let conn = self.get_connection()?;

        let message = conn
            .query_row(
                &format!("SELECT * FROM {} WHERE {} = ?", messages::TABLE, messages::ID),
                params![message_id],
                Self::map_db_message,
            )
            .optional()?;

        Ok(message)
    }

    /// Get the messages a contact sent, optionally within a date range
    pub fn get_messages_for_contact(
        &self,
        contact_name: &str,
        start_date: Option<NaiveDateTime>,
        end_date: Option<NaiveDateTime>,
    ) -> Result<Vec<DbMessage>> {
        let conn = self.get_connection()?;

        let mut query = format!(
            "SELECT m.* FROM {} m JOIN {} c ON m.{} = c.{} WHERE c.{} = ? AND m.{} = 0",
            messages::TABLE,
            contacts::TABLE,
            messages::CONTACT_ID,
            contacts::ID,
            contacts::NAME,
            messages::IS_FROM_ME
        );
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(contact_name.to_string())];

        if let Some(start) = start_date {
            query.push_str(&format!(" AND m.{} >= ?", messages::DATE_CREATED));
            params.push(Box::new(start));
        }

        if let Some(end) = end_date {
            query.push_str(&format!(" AND m.{} <= ?", messages::DATE_CREATED));
            params.push(Box::new(end));
        }

        query.push_str(&format!(" ORDER BY m.{} ASC", messages::DATE_CREATED));

        let mut stmt = conn.prepare(&query)?;
        let message_iter =
            stmt.query_map(rusqlite::params_from_iter(params.iter()), Self::map_db_message)?;

        let mut results = Vec::new();
        for message in message_iter {
            results.push(message?);
        }

        Ok(results)
    }

    /// Insert a feedback record, overwriting any record with the same id
    pub fn upsert_feedback(&self, record: &FeedbackRecord) -> Result<()> {
        let conn = self.get_connection()?;
        let keywords = serde_json::to_string(&record.keywords)?;

        conn.execute(
            &format!(
                "INSERT INTO {table} ({id}, {message_id}, {contact_name}, {contact_phone}, {original_text}, \
                 {cleaned_text}, {sentiment}, {score}, {keywords}, {source_timestamp}, {analyzed_at}) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
                 ON CONFLICT({id}) DO UPDATE SET \
                 {message_id} = excluded.{message_id}, \
                 {contact_name} = excluded.{contact_name}, \
                 {contact_phone} = excluded.{contact_phone}, \
                 {original_text} = excluded.{original_text}, \
                 {cleaned_text} = excluded.{cleaned_text}, \
                 {sentiment} = excluded.{sentiment}, \
                 {score} = excluded.{score}, \
                 {keywords} = excluded.{keywords}, \
                 {source_timestamp} = excluded.{source_timestamp}, \
                 {analyzed_at} = excluded.{analyzed_at}",
                table = feedback::TABLE,
                id = feedback::ID,
                message_id = feedback::MESSAGE_ID,
                contact_name = feedback::CONTACT_NAME,
                contact_phone = feedback::CONTACT_PHONE,
                original_text = feedback::ORIGINAL_TEXT,
                cleaned_text = feedback::CLEANED_TEXT,
                sentiment = feedback::SENTIMENT,
                score = feedback::SCORE,
                keywords = feedback::KEYWORDS,
                source_timestamp = feedback::SOURCE_TIMESTAMP,
                analyzed_at = feedback::ANALYZED_AT,
            ),
            params![
                record.id,
                record.message_id,
                record.contact_name,
                record.contact_phone,
                record.original_text,
                record.cleaned_text,
                record.sentiment.as_str(),
                record.score,
                keywords,
                record.source_timestamp,
                record.analyzed_at
            ],
        )?;

        Ok(())
    }

    /// Get a feedback record by id
    pub fn get_feedback(&self, id: &str) -> Result<Option<FeedbackRecord>> {
        let conn = self.get_connection()?;

        let record = conn
            .query_row(
                &format!("SELECT * FROM {} WHERE {} = ?", feedback::TABLE, feedback::ID),
                params![id],
                Self::map_feedback,
            )
            .optional()?;

        Ok(record)
    }

    /// Most recent feedback records with the given label
    pub fn list_feedback_by_sentiment(
        &self,
        label: SentimentLabel,
        limit: usize,
    ) -> Result<Vec<FeedbackRecord>> {
        let conn = self.get_connection()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT * FROM {} WHERE {} = ? ORDER BY {} DESC LIMIT ?",
            feedback::TABLE,
            feedback::SENTIMENT,
            feedback::ANALYZED_AT
        ))?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map(params![label.as_str(), limit], Self::map_feedback)?;

        let mut results = Vec::new();
        for record in rows {
            results.push(record?);
        }
        Ok(results)
    }

    /// Count feedback records per label
    pub fn feedback_stats(&self) -> Result<FeedbackStats> {
        let conn = self.get_connection()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {}, COUNT(*) FROM {} GROUP BY {}",
            feedback::SENTIMENT,
            feedback::TABLE,
            feedback::SENTIMENT
        ))?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;

        let mut stats = FeedbackStats::default();
        for row in rows {
            let (label, count) = row?;
            let count = usize::try_from(count).unwrap_or(0);
            match label.parse::<SentimentLabel>() {
                Ok(SentimentLabel::Positive) => stats.positive = count,
                Ok(SentimentLabel::Negative) => stats.negative = count,
                Ok(SentimentLabel::Neutral) => stats.neutral = count,
                Err(e) => debug!(error = %e, "Ignoring unknown sentiment label"),
            }
        }
        Ok(stats)
    }

    /// Delete feedback analyzed before the cutoff, returning the number removed
    pub fn delete_feedback_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let conn = self.get_connection()?;

        let removed = conn.execute(
            &format!(
                "DELETE FROM {} WHERE {} < ?",
                feedback::TABLE,
                feedback::ANALYZED_AT
            ),
            params![cutoff],
        )?;

        info!(removed, cutoff = %cutoff, "Purged old feedback");
        Ok(removed)
    }

    /// Map a database row to a DbContact
    fn map_db_contact(row: &Row) -> rusqlite::Result<DbContact> {
        Ok(DbContact {
            id: row.get(contacts::ID)?,
            name: row.get(contacts::NAME)?,
            phone: row.get(contacts::PHONE)?,
            email: row.get(contacts::EMAIL)?,
        })
    }

    /// Map a database row to a DbMessage
    fn map_db_message(row: &Row) -> rusqlite::Result<DbMessage> {
        Ok(DbMessage {
            id: row.get(messages::ID)?,
            external_id: row.get(messages::EXTERNAL_ID)?,
            contact_id: row.get(messages::CONTACT_ID)?,
            sender: row.get(messages::SENDER)?,
            text: row.get(messages::TEXT)?,
            is_from_me: row.get(messages::IS_FROM_ME)?,
            date_created: row.get(messages::DATE_CREATED)?,
            date_imported: row.get(messages::DATE_IMPORTED)?,
        })
    }

    /// Map a database row to a FeedbackRecord
    fn map_feedback(row: &Row) -> rusqlite::Result<FeedbackRecord> {
        let sentiment: String = row.get(feedback::SENTIMENT)?;
        let sentiment = sentiment
            .parse::<SentimentLabel>()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, e.into()))?;

        let keywords: String = row.get(feedback::KEYWORDS)?;
        let keywords: Vec<String> = serde_json::from_str(&keywords)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?;

        Ok(FeedbackRecord {
            id: row.get(feedback::ID)?,
            message_id: row.get(feedback::MESSAGE_ID)?,
            contact_name: row.get(feedback::CONTACT_NAME)?,
            contact_phone: row.get(feedback::CONTACT_PHONE)?,
            original_text: row.get(feedback::ORIGINAL_TEXT)?,
            cleaned_text: row.get(feedback::CLEANED_TEXT)?,
            sentiment,
            score: row.get(feedback::SCORE)?,
            keywords,
            source_timestamp: row.get(feedback::SOURCE_TIMESTAMP)?,
            analyzed_at: row.get(feedback::ANALYZED_AT)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_path_from_url() {
        assert_eq!(database_path_from_url("sqlite:data/desk.db"), "data/desk.db");
        assert_eq!(database_path_from_url("sqlite:///tmp/desk.db"), "/tmp/desk.db");
        assert_eq!(database_path_from_url("plain.db"), "plain.db");
    }
}
