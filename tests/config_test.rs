//! Tests for configuration defaults and validation

use customer_desk::config::{AppConfig, ImportConfig, SentimentConfig};

#[test]
fn test_default_database_and_logging() {
    let config = AppConfig::default();

    assert_eq!(config.database.url, "sqlite:data/desk.db");
    assert_eq!(config.database.max_connections, 10);
    assert_eq!(config.database.connection_timeout_secs, 30);
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.logging.file_path, None);
    assert_eq!(config.logging.format, "text");
}

#[test]
fn test_default_import_config() {
    let import = ImportConfig::default();

    assert_eq!(import.database_path, "data/imported.db");
    assert_eq!(import.output_directory, "./output");
    assert_eq!(import.datetime_sample_size, 10);
    assert!(import.skip_blank_rows);
}

#[test]
fn test_default_sentiment_config() {
    let sentiment = SentimentConfig::default();

    assert!((sentiment.significance_threshold - 0.05).abs() < f64::EPSILON);
    assert_eq!(sentiment.max_keywords, 10);
    assert_eq!(sentiment.min_keyword_length, 3);
    assert_eq!(sentiment.max_text_length, 10_000);
    assert!(!sentiment.trim_keyword_punctuation);
}

#[test]
fn test_default_config_is_valid() {
    assert!(AppConfig::default().validate().is_ok());
}

#[test]
fn test_invalid_database_settings() {
    let mut config = AppConfig::default();
    config.database.max_connections = 0;
    assert!(config.validate().is_err());

    let mut config = AppConfig::default();
    config.database.connection_timeout_secs = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_invalid_logging_settings() {
    let mut config = AppConfig::default();
    config.logging.level = "verbose".to_string();
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("Invalid log level"));

    let mut config = AppConfig::default();
    config.logging.format = "xml".to_string();
    assert!(config.validate().is_err());

    let mut config = AppConfig::default();
    config.logging.format = "json".to_string();
    assert!(config.validate().is_ok());
}

#[test]
fn test_invalid_import_settings() {
    let mut config = AppConfig::default();
    config.import.database_path = "  ".to_string();
    assert!(config.validate().is_err());

    let mut config = AppConfig::default();
    config.import.output_directory = String::new();
    assert!(config.validate().is_err());

    let mut config = AppConfig::default();
    config.import.datetime_sample_size = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_invalid_sentiment_settings() {
    for threshold in [-0.1, 1.0, 2.5] {
        let mut config = AppConfig::default();
        config.sentiment.significance_threshold = threshold;
        assert!(config.validate().is_err(), "threshold {threshold} accepted");
    }

    let mut config = AppConfig::default();
    config.sentiment.significance_threshold = 0.0;
    assert!(config.validate().is_ok());

    let mut config = AppConfig::default();
    config.sentiment.max_keywords = 0;
    assert!(config.validate().is_err());

    let mut config = AppConfig::default();
    config.sentiment.max_text_length = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_config_serialization_round_trip() {
    let config = AppConfig::default();
    let json = serde_json::to_string(&config).expect("serialize config");
    let parsed: AppConfig = serde_json::from_str(&json).expect("deserialize config");

    assert_eq!(parsed.database.url, config.database.url);
    assert_eq!(parsed.import.output_directory, config.import.output_directory);
    assert_eq!(parsed.sentiment.max_keywords, config.sentiment.max_keywords);
}
