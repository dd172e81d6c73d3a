use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

/// Application configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application database (contacts, messages, feedback)
    pub database: DatabaseConfig,
    /// Log output settings
    pub logging: LoggingConfig,
    /// Spreadsheet import settings
    pub import: ImportConfig,
    /// Sentiment classifier settings
    pub sentiment: SentimentConfig,
}

/// Application database settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// `sqlite:` URL of the application database
    pub url: String,
    /// Maximum pooled connections
    pub max_connections: u32,
    /// Seconds to wait for a pooled connection
    pub connection_timeout_secs: u64,
}

/// Log output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter level when `RUST_LOG` is unset
    pub level: String,
    /// Optional log file; its directory receives daily rolling files
    pub file_path: Option<String>,
    /// "json" or "text"
    pub format: String,
}

/// Spreadsheet import settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    /// SQLite file receiving imported tables
    pub database_path: String,
    /// Directory for generated SQL scripts and summaries
    pub output_directory: String,
    /// Non-null samples inspected when testing a column for datetimes
    pub datetime_sample_size: usize,
    /// Drop rows in which every cell is empty
    pub skip_blank_rows: bool,
}

/// Sentiment classifier settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentConfig {
    /// Density a label must strictly exceed to win
    pub significance_threshold: f64,
    /// Maximum keywords attached to a feedback record
    pub max_keywords: usize,
    /// Minimum keyword length in characters
    pub min_keyword_length: usize,
    /// Only the first `max_text_length` characters of a message are classified
    pub max_text_length: usize,
    /// Strip `. , ! ? -` from token edges before the keyword lookup
    #[serde(default)]
    pub trim_keyword_punctuation: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite:data/desk.db".to_string(),
                max_connections: 10,
                connection_timeout_secs: 30,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file_path: None,
                format: "text".to_string(),
            },
            import: ImportConfig::default(),
            sentiment: SentimentConfig::default(),
        }
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            database_path: "data/imported.db".to_string(),
            output_directory: "./output".to_string(),
            datetime_sample_size: 10,
            skip_blank_rows: true,
        }
    }
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            significance_threshold: 0.05,
            max_keywords: 10,
            min_keyword_length: 3,
            max_text_length: 10_000,
            trim_keyword_punctuation: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources with precedence
    pub fn load() -> Result<Self> {
        let defaults = Config::try_from(&Self::default())
            .map_err(|e| anyhow::anyhow!("Failed to build default configuration: {}", e))?;

        let config = Config::builder()
            // Start with default values
            .add_source(defaults)
            // Add config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(File::with_name("config").required(false))
            // Add environment variables with prefix
            .add_source(
                Environment::with_prefix("CUSTOMER_DESK")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| anyhow::anyhow!("Failed to deserialize configuration: {}", e))?;

        app_config.validate()?;

        Ok(app_config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.database.max_connections == 0 {
            return Err(anyhow::anyhow!("max_connections must be greater than 0"));
        }
        if self.database.connection_timeout_secs == 0 {
            return Err(anyhow::anyhow!("connection_timeout_secs must be greater than 0"));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log level: {}. Must be one of: {:?}",
                self.logging.level,
                valid_levels
            ));
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log format: {}. Must be one of: {:?}",
                self.logging.format,
                valid_formats
            ));
        }

        if self.import.database_path.trim().is_empty() {
            return Err(anyhow::anyhow!("import.database_path cannot be empty"));
        }
        if self.import.output_directory.trim().is_empty() {
            return Err(anyhow::anyhow!("import.output_directory cannot be empty"));
        }
        if self.import.datetime_sample_size == 0 {
            return Err(anyhow::anyhow!("datetime_sample_size must be greater than 0"));
        }

        let threshold = self.sentiment.significance_threshold;
        if !(0.0..1.0).contains(&threshold) {
            return Err(anyhow::anyhow!(
                "significance_threshold must be in [0, 1), got {}",
                threshold
            ));
        }
        if self.sentiment.max_keywords == 0 {
            return Err(anyhow::anyhow!("max_keywords must be greater than 0"));
        }
        if self.sentiment.max_text_length == 0 {
            return Err(anyhow::anyhow!("max_text_length must be greater than 0"));
        }

        Ok(())
    }

    /// Get database URL from environment or config
    #[must_use]
    pub fn get_database_url(&self) -> String {
        std::env::var("DATABASE_URL").unwrap_or_else(|_| self.database.url.clone())
    }
}
