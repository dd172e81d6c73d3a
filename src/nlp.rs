use anyhow::Result;
use chrono::Utc;
use regex::Regex;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};
use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

use crate::config::SentimentConfig;
use crate::error::DeskError;
use crate::lexicon::Lexicon;
use crate::metrics::MetricsCollector;
use crate::models::{FeedbackRecord, IncomingMessage, SentimentAnalysis, SentimentLabel};

/// Emoticons, pictographs, transport, regional flags and dingbats
const EMOJI_PATTERN: &str = r"[\x{1F600}-\x{1F64F}\x{1F300}-\x{1F5FF}\x{1F680}-\x{1F6FF}\x{1F1E0}-\x{1F1FF}\x{2702}-\x{27B0}]";

/// Lexicon-based sentiment classifier for customer messages
///
/// The analyzer holds only read-only state, so one instance can be shared
/// across threads behind an `Arc`.
pub struct SentimentAnalyzer {
    lexicon: Arc<Lexicon>,
    config: SentimentConfig,
    metrics: MetricsCollector,
    emoji_regex: Regex,
    special_chars_regex: Regex,
    extra_spaces_regex: Regex,
}

impl SentimentAnalyzer {
    /// Create an analyzer over the given lexicon
    pub fn new(lexicon: Arc<Lexicon>, config: SentimentConfig) -> Result<Self> {
        let emoji_regex = Regex::new(EMOJI_PATTERN)
            .map_err(|e| anyhow::anyhow!("Failed to compile emoji regex: {e}"))?;
        let special_chars_regex = Regex::new(r"[^\w\s.,!?\-]")
            .map_err(|e| anyhow::anyhow!("Failed to compile special chars regex: {e}"))?;
        let extra_spaces_regex = Regex::new(r"\s+")
            .map_err(|e| anyhow::anyhow!("Failed to compile spaces regex: {e}"))?;

        Ok(Self {
            lexicon,
            config,
            metrics: MetricsCollector::default(),
            emoji_regex,
            special_chars_regex,
            extra_spaces_regex,
        })
    }

    /// Analyzer over the built-in Portuguese lexicon with default settings
    pub fn portuguese() -> Result<Self> {
        Self::new(Arc::new(Lexicon::portuguese()), SentimentConfig::default())
    }

    /// The lexicon this analyzer matches against
    #[must_use]
    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    /// Strip emojis and noise characters, then normalize whitespace
    ///
    /// Case is preserved; sentence punctuation (`. , ! ? -`) survives.
    #[must_use]
    pub fn clean_text(&self, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }

        let normalized = text.nfc().collect::<String>();
        let no_emojis = self.emoji_regex.replace_all(&normalized, "");
        let no_special = self.special_chars_regex.replace_all(&no_emojis, "");
        let normalized_spaces = self.extra_spaces_regex.replace_all(&no_special, " ");

        normalized_spaces.trim().to_string()
    }

    /// Classify a text into (label, score, keywords)
    ///
    /// Never fails: any classification error is logged and converted to the
    /// neutral result.
    #[must_use]
    pub fn analyze_sentiment(&self, text: &str) -> SentimentAnalysis {
        match self.try_analyze(text) {
            Ok(analysis) => {
                self.metrics.record_sentiment_analysis(
                    analysis.label,
                    analysis.score,
                    text.chars().count(),
                );
                analysis
            }
            Err(e) => {
                warn!(error = %e, "Sentiment analysis failed, falling back to neutral");
                self.metrics.record_sentiment_fallback("classification_error");
                SentimentAnalysis::neutral()
            }
        }
    }

    fn try_analyze(&self, text: &str) -> Result<SentimentAnalysis, DeskError> {
        if text.trim().is_empty() {
            return Ok(SentimentAnalysis::neutral());
        }

        let text = match text.char_indices().nth(self.config.max_text_length) {
            Some((cut, _)) => {
                debug!(limit = self.config.max_text_length, "Classifying truncated text");
                &text[..cut]
            }
            None => text,
        };

        let cleaned = self.clean_text(&text.to_lowercase());
        let tokens: Vec<&str> = cleaned.split_whitespace().collect();
        if tokens.is_empty() {
            return Ok(SentimentAnalysis::neutral());
        }

        let total = tokens.len() as f64;
        let positive = count_matches(&cleaned, self.lexicon.positive()) as f64 / total;
        let negative = count_matches(&cleaned, self.lexicon.negative()) as f64 / total;
        let neutral = count_matches(&cleaned, self.lexicon.neutral()) as f64 / total;

        if ![positive, negative, neutral].iter().all(|d| d.is_finite()) {
            return Err(DeskError::Classification(format!(
                "non-finite density over {} tokens",
                tokens.len()
            )));
        }

        let threshold = self.config.significance_threshold;
        let (label, density) = if positive > negative && positive > threshold {
            (SentimentLabel::Positive, positive)
        } else if negative > positive && negative > threshold {
            (SentimentLabel::Negative, negative)
        } else {
            (SentimentLabel::Neutral, neutral)
        };

        let keywords = self.extract_keywords(&tokens);

        debug!(
            label = %label,
            positive,
            negative,
            neutral,
            tokens = tokens.len(),
            "Classified message"
        );

        Ok(SentimentAnalysis {
            label,
            score: density.clamp(0.0, 1.0),
            keywords,
        })
    }

    /// Lexicon tokens that are not stop words, in first-occurrence order
    fn extract_keywords(&self, tokens: &[&str]) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut keywords = Vec::new();

        for token in tokens {
            let word = if self.config.trim_keyword_punctuation {
                token.trim_matches(|c: char| matches!(c, '.' | ',' | '!' | '?' | '-'))
            } else {
                token
            };
            if word.chars().count() < self.config.min_keyword_length
                || self.lexicon.is_stop_word(word)
                || !self.lexicon.contains(word)
            {
                continue;
            }
            if seen.insert(word) {
                keywords.push(word.to_string());
                if keywords.len() == self.config.max_keywords {
                    break;
                }
            }
        }

        keywords
    }

    /// Analyze a message into a feedback record ready for persistence
    ///
    /// Stored messages get the stable id `feedback_<message_id>`, so
    /// reprocessing overwrites the previous record. Ad-hoc texts get a random id.
    #[must_use]
    pub fn analyze_message(&self, message: &IncomingMessage) -> FeedbackRecord {
        let analysis = self.analyze_sentiment(&message.text);
        let id = message.message_id.map_or_else(
            || format!("feedback_{}", Uuid::new_v4().simple()),
            |message_id| format!("feedback_{message_id}"),
        );

        FeedbackRecord {
            id,
            message_id: message.message_id,
            contact_name: message.contact_name.clone(),
            contact_phone: message.contact_phone.clone(),
            original_text: message.text.clone(),
            cleaned_text: self.clean_text(&message.text),
            sentiment: analysis.label,
            score: analysis.score,
            keywords: analysis.keywords,
            source_timestamp: message.timestamp,
            analyzed_at: Utc::now(),
        }
    }
}

/// Occurrences of every lexicon entry in the text, overlapping entries included
fn count_matches(text: &str, words: &[String]) -> usize {
    words.iter().map(|word| text.matches(word.as_str()).count()).sum()
}
