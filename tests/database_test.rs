use chrono::{Duration, NaiveDate, NaiveDateTime, Utc};
use tempfile::{tempdir, TempDir};

use customer_desk::db::Database;
use customer_desk::models::{FeedbackRecord, NewContact, NewMessage, SentimentLabel};

fn test_database() -> (TempDir, Database) {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let db_url = format!("sqlite://{}", temp_dir.path().join("desk.db").display());
    let db = Database::new(&db_url).expect("Failed to create database");
    (temp_dir, db)
}

fn at(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 3, day)
        .and_then(|d| d.and_hms_opt(hour, 0, 0))
        .expect("valid date")
}

fn new_message(external_id: &str, contact_id: i64, text: &str, created: NaiveDateTime) -> NewMessage {
    NewMessage {
        external_id: external_id.to_string(),
        contact_id: Some(contact_id),
        sender: "Maria".to_string(),
        text: Some(text.to_string()),
        is_from_me: false,
        date_created: created,
        date_imported: None,
    }
}

fn feedback(id: &str, message_id: Option<i64>, sentiment: SentimentLabel) -> FeedbackRecord {
    FeedbackRecord {
        id: id.to_string(),
        message_id,
        contact_name: Some("Maria".to_string()),
        contact_phone: Some("+5511999990000".to_string()),
        original_text: "Ótimo atendimento!".to_string(),
        cleaned_text: "Ótimo atendimento!".to_string(),
        sentiment,
        score: 0.5,
        keywords: vec!["ótimo".to_string(), "atendimento".to_string()],
        source_timestamp: Some(at(1, 9).and_utc()),
        analyzed_at: Utc::now(),
    }
}

#[test]
fn test_database_creation_and_initialization() {
    let (_dir, db) = test_database();
    let _conn = db.get_connection().expect("Failed to get database connection");

    // Opening the same file again re-runs migrations harmlessly
    let (dir, _) = test_database();
    let url = format!("sqlite://{}", dir.path().join("desk.db").display());
    Database::new(&url).expect("First open");
    Database::new(&url).expect("Second open");
}

#[test]
fn test_contact_management() {
    let (_dir, db) = test_database();

    let contact = db
        .add_or_update_contact(NewContact {
            name: "Maria Silva".to_string(),
            phone: Some("+5511999990000".to_string()),
            email: None,
        })
        .expect("Failed to add contact");
    assert_eq!(contact.name, "Maria Silva");

    // Same name updates in place
    let updated = db
        .add_or_update_contact(NewContact {
            name: "Maria Silva".to_string(),
            phone: Some("+5511988887777".to_string()),
            email: Some("maria@example.com".to_string()),
        })
        .expect("Failed to update contact");
    assert_eq!(updated.id, contact.id);
    assert_eq!(updated.phone.as_deref(), Some("+5511988887777"));

    let by_name = db.get_contact("Maria Silva").unwrap().expect("contact by name");
    assert_eq!(by_name.email.as_deref(), Some("maria@example.com"));

    let by_phone = db.get_contact_by_phone("+5511988887777").unwrap();
    assert_eq!(by_phone.map(|c| c.id), Some(contact.id));

    assert!(db.get_contact("Desconhecido").unwrap().is_none());
    assert_eq!(db.list_contacts().unwrap().len(), 1);
}

#[test]
fn test_message_deduplication_and_filtering() {
    let (_dir, db) = test_database();
    let contact = db
        .add_or_update_contact(NewContact {
            name: "Maria".to_string(),
            phone: None,
            email: None,
        })
        .unwrap();

    let first = db
        .add_message(new_message("wa-1", contact.id, "Olá", at(1, 9)))
        .unwrap();
    let again = db
        .add_message(new_message("wa-1", contact.id, "Olá de novo", at(1, 9)))
        .unwrap();
    assert_eq!(first.id, again.id);
    assert_eq!(again.text.as_deref(), Some("Olá"));

    db.add_message(new_message("wa-2", contact.id, "Pedido atrasado", at(5, 9)))
        .unwrap();
    db.add_message(NewMessage {
        is_from_me: true,
        sender: "Atendente".to_string(),
        ..new_message("wa-3", contact.id, "Vamos verificar", at(5, 10))
    })
    .unwrap();

    let all = db.get_messages_for_contact("Maria", None, None).unwrap();
    assert_eq!(
        all.iter().map(|m| m.external_id.as_str()).collect::<Vec<_>>(),
        ["wa-1", "wa-2"]
    );

    let recent = db
        .get_messages_for_contact("Maria", Some(at(2, 0)), None)
        .unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].external_id, "wa-2");

    let fetched = db.get_message_by_id(first.id).unwrap().expect("stored message");
    assert_eq!(fetched.date_created, at(1, 9));
}

#[test]
fn test_feedback_upsert_is_idempotent() {
    let (_dir, db) = test_database();
    let contact = db
        .add_or_update_contact(NewContact {
            name: "Maria".to_string(),
            phone: None,
            email: None,
        })
        .unwrap();
    let message = db
        .add_message(new_message("wa-1", contact.id, "Ótimo atendimento!", at(1, 9)))
        .unwrap();

    let id = format!("feedback_{}", message.id);
    let record = feedback(&id, Some(message.id), SentimentLabel::Positive);
    db.upsert_feedback(&record).unwrap();
    db.upsert_feedback(&record).unwrap();

    let stored = db.get_feedback(&id).unwrap().expect("stored feedback");
    assert_eq!(stored.message_id, Some(message.id));
    assert_eq!(stored.sentiment, SentimentLabel::Positive);
    assert_eq!(stored.keywords, record.keywords);
    assert_eq!(stored.source_timestamp, record.source_timestamp);
    assert_eq!(db.feedback_stats().unwrap().total(), 1);

    // A later analysis overwrites the label
    db.upsert_feedback(&FeedbackRecord {
        sentiment: SentimentLabel::Negative,
        ..record
    })
    .unwrap();
    let stored = db.get_feedback(&id).unwrap().unwrap();
    assert_eq!(stored.sentiment, SentimentLabel::Negative);
    assert_eq!(db.feedback_stats().unwrap().total(), 1);
}

#[test]
fn test_feedback_stats_and_listing() {
    let (_dir, db) = test_database();

    db.upsert_feedback(&feedback("feedback_a", None, SentimentLabel::Positive)).unwrap();
    db.upsert_feedback(&feedback("feedback_b", None, SentimentLabel::Positive)).unwrap();
    db.upsert_feedback(&feedback("feedback_c", None, SentimentLabel::Negative)).unwrap();
    db.upsert_feedback(&feedback("feedback_d", None, SentimentLabel::Neutral)).unwrap();

    let stats = db.feedback_stats().unwrap();
    assert_eq!(stats.positive, 2);
    assert_eq!(stats.negative, 1);
    assert_eq!(stats.neutral, 1);
    assert_eq!(stats.total(), 4);

    let positive = db.list_feedback_by_sentiment(SentimentLabel::Positive, 10).unwrap();
    assert_eq!(positive.len(), 2);
    assert!(positive.iter().all(|r| r.sentiment == SentimentLabel::Positive));

    let limited = db.list_feedback_by_sentiment(SentimentLabel::Positive, 1).unwrap();
    assert_eq!(limited.len(), 1);
}

#[test]
fn test_delete_feedback_before_cutoff() {
    let (_dir, db) = test_database();

    db.upsert_feedback(&FeedbackRecord {
        analyzed_at: Utc::now() - Duration::days(120),
        ..feedback("feedback_old", None, SentimentLabel::Negative)
    })
    .unwrap();
    db.upsert_feedback(&feedback("feedback_new", None, SentimentLabel::Positive)).unwrap();

    let removed = db
        .delete_feedback_before(Utc::now() - Duration::days(90))
        .unwrap();
    assert_eq!(removed, 1);
    assert!(db.get_feedback("feedback_old").unwrap().is_none());
    assert!(db.get_feedback("feedback_new").unwrap().is_some());
}
