//! Data models for contacts, messages and analyzed feedback
//!
//! This module contains the data structures shared by the classifier, the
//! persistence layer and the command line, including their database rows.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A chat message handed to the classifier
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncomingMessage {
    /// Database id when the message is already stored
    #[serde(default)]
    pub message_id: Option<i64>,
    /// Message text content
    pub text: String,
    /// Sender's display name
    #[serde(default)]
    pub contact_name: Option<String>,
    /// Sender's phone number
    #[serde(default)]
    pub contact_phone: Option<String>,
    /// When the message was sent
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl IncomingMessage {
    /// Build a message from text only
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            ..Self::default()
        }
    }
}

/// Sentiment label assigned to a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    /// Positive lexicon density won
    Positive,
    /// Negative lexicon density won
    Negative,
    /// Neither side cleared the threshold
    Neutral,
}

impl SentimentLabel {
    /// Lowercase name stored in the database
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Neutral => "neutral",
        }
    }

    /// All labels, in reporting order
    #[must_use]
    pub const fn all() -> [Self; 3] {
        [Self::Positive, Self::Negative, Self::Neutral]
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SentimentLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "positive" => Ok(Self::Positive),
            "negative" => Ok(Self::Negative),
            "neutral" => Ok(Self::Neutral),
            other => Err(format!("Unknown sentiment label: {other}")),
        }
    }
}

/// Result of classifying one text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentAnalysis {
    /// Winning label
    pub label: SentimentLabel,
    /// Lexicon-word density of the winning label (neutral density for neutral)
    pub score: f64,
    /// Matched lexicon keywords, deduplicated and capped
    pub keywords: Vec<String>,
}

impl SentimentAnalysis {
    /// The neutral/0.0/[] result used for empty input and failures
    #[must_use]
    pub const fn neutral() -> Self {
        Self {
            label: SentimentLabel::Neutral,
            score: 0.0,
            keywords: Vec::new(),
        }
    }
}

/// An analyzed message, ready for persistence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    /// Unique feedback id; re-upserting the same id overwrites the record
    pub id: String,
    /// Stored message this feedback was derived from
    pub message_id: Option<i64>,
    /// Sender's display name
    pub contact_name: Option<String>,
    /// Sender's phone number
    pub contact_phone: Option<String>,
    /// Text as received
    pub original_text: String,
    /// Text after emoji and noise stripping
    pub cleaned_text: String,
    /// Sentiment label
    pub sentiment: SentimentLabel,
    /// Lexicon density in [0, 1]
    pub score: f64,
    /// Matched keywords (at most the configured cap)
    pub keywords: Vec<String>,
    /// When the message was sent
    pub source_timestamp: Option<DateTime<Utc>>,
    /// When the analysis ran
    pub analyzed_at: DateTime<Utc>,
}

/// Database representation of a contact
#[derive(Debug, Clone)]
pub struct DbContact {
    /// Database primary key
    pub id: i64,
    /// Contact's display name
    pub name: String,
    /// Contact's phone number
    pub phone: Option<String>,
    /// Contact's email address
    pub email: Option<String>,
}

/// Data for creating a new contact
#[derive(Debug, Clone)]
pub struct NewContact {
    /// Contact's display name
    pub name: String,
    /// Contact's phone number
    pub phone: Option<String>,
    /// Contact's email address
    pub email: Option<String>,
}

/// Database representation of a message
#[derive(Debug, Clone)]
pub struct DbMessage {
    /// Database primary key
    pub id: i64,
    /// Gateway message identifier
    pub external_id: String,
    /// Foreign key to contacts table
    pub contact_id: Option<i64>,
    /// Sender name
    pub sender: String,
    /// Message text content
    pub text: Option<String>,
    /// True if the business sent the message
    pub is_from_me: bool,
    /// Timestamp when message was created
    pub date_created: NaiveDateTime,
    /// Timestamp when message was stored
    pub date_imported: NaiveDateTime,
}

impl DbMessage {
    /// Convert to a classifier input, attaching the contact's phone
    #[must_use]
    pub fn to_incoming(&self, phone: Option<&str>) -> IncomingMessage {
        IncomingMessage {
            message_id: Some(self.id),
            text: self.text.clone().unwrap_or_default(),
            contact_name: Some(self.sender.clone()),
            contact_phone: phone.map(ToString::to_string),
            timestamp: Some(self.date_created.and_utc()),
        }
    }
}

/// Data for creating a new message
#[derive(Debug, Clone)]
pub struct NewMessage {
    /// Gateway message identifier
    pub external_id: String,
    /// Foreign key to contacts table
    pub contact_id: Option<i64>,
    /// Sender name
    pub sender: String,
    /// Message text content
    pub text: Option<String>,
    /// True if the business sent the message
    pub is_from_me: bool,
    /// Timestamp when message was created
    pub date_created: NaiveDateTime,
    /// Timestamp when message was stored (optional, defaults to now)
    pub date_imported: Option<NaiveDateTime>,
}

/// Feedback counts per sentiment label
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackStats {
    /// Positive feedback records
    pub positive: usize,
    /// Negative feedback records
    pub negative: usize,
    /// Neutral feedback records
    pub neutral: usize,
}

impl FeedbackStats {
    /// Total records counted
    #[must_use]
    pub const fn total(&self) -> usize {
        self.positive + self.negative + self.neutral
    }
}
