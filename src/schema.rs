//! Database schema definitions
//!
//! This module provides constants for table and column names used with rusqlite.
//! They must match the embedded migrations under `migrations/`.

/// Contacts table schema
pub mod contacts {
    /// Table name
    pub const TABLE: &str = "contacts";
    /// Primary key column
    pub const ID: &str = "id";
    /// Contact name column
    pub const NAME: &str = "name";
    /// Phone number column
    pub const PHONE: &str = "phone";
    /// Email address column
    pub const EMAIL: &str = "email";
}

/// Messages table schema
pub mod messages {
    /// Table name
    pub const TABLE: &str = "messages";
    /// Primary key column
    pub const ID: &str = "id";
    /// Gateway message identifier column
    pub const EXTERNAL_ID: &str = "external_id";
    /// Foreign key to contacts
    pub const CONTACT_ID: &str = "contact_id";
    /// Sender name column
    pub const SENDER: &str = "sender";
    /// Message text content column
    pub const TEXT: &str = "text";
    /// Flag indicating if the business sent the message
    pub const IS_FROM_ME: &str = "is_from_me";
    /// Message creation timestamp column
    pub const DATE_CREATED: &str = "date_created";
    /// Message import timestamp column
    pub const DATE_IMPORTED: &str = "date_imported";
}

/// Feedback table schema
pub mod feedback {
    /// Table name
    pub const TABLE: &str = "feedback";
    /// Primary key column (`feedback_...`)
    pub const ID: &str = "id";
    /// Foreign key to messages table
    pub const MESSAGE_ID: &str = "message_id";
    /// Contact name column
    pub const CONTACT_NAME: &str = "contact_name";
    /// Contact phone column
    pub const CONTACT_PHONE: &str = "contact_phone";
    /// Raw text column
    pub const ORIGINAL_TEXT: &str = "original_text";
    /// Cleaned text column
    pub const CLEANED_TEXT: &str = "cleaned_text";
    /// Sentiment label column
    pub const SENTIMENT: &str = "sentiment";
    /// Density score column
    pub const SCORE: &str = "score";
    /// JSON-encoded keyword list column
    pub const KEYWORDS: &str = "keywords";
    /// Source message timestamp column
    pub const SOURCE_TIMESTAMP: &str = "source_timestamp";
    /// Analysis timestamp column
    pub const ANALYZED_AT: &str = "analyzed_at";
}
