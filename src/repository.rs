use chrono::{DateTime, Utc};

#[cfg(test)]
use mockall::automock;

use crate::db::Database;
use crate::error::Result;
use crate::models::{DbContact, DbMessage, FeedbackRecord, FeedbackStats, NewContact};

/// Storage used by the feedback and contact services
#[cfg_attr(test, automock)]
pub trait FeedbackStore {
    /// Insert or update a contact by name
    fn save_contact(&self, contact: NewContact) -> Result<DbContact>;

    /// Find a contact by name
    fn find_contact(&self, name: &str) -> Result<Option<DbContact>>;

    /// Messages the contact sent, oldest first
    fn messages_for_contact(&self, name: &str) -> Result<Vec<DbMessage>>;

    /// Insert or overwrite a feedback record by id
    fn upsert_feedback(&self, record: &FeedbackRecord) -> Result<()>;

    /// Count feedback records per label
    fn feedback_stats(&self) -> Result<FeedbackStats>;

    /// Delete feedback analyzed before the cutoff
    fn delete_feedback_before(&self, cutoff: DateTime<Utc>) -> Result<usize>;
}

impl FeedbackStore for Database {
    fn save_contact(&self, contact: NewContact) -> Result<DbContact> {
        self.add_or_update_contact(contact)
    }

    fn find_contact(&self, name: &str) -> Result<Option<DbContact>> {
        self.get_contact(name)
    }

    fn messages_for_contact(&self, name: &str) -> Result<Vec<DbMessage>> {
        self.get_messages_for_contact(name, None, None)
    }

    fn upsert_feedback(&self, record: &FeedbackRecord) -> Result<()> {
        Self::upsert_feedback(self, record)
    }

    fn feedback_stats(&self) -> Result<FeedbackStats> {
        Self::feedback_stats(self)
    }

    fn delete_feedback_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        Self::delete_feedback_before(self, cutoff)
    }
}
