use anyhow::{anyhow, Result};
use std::path::Path;

use crate::workbook::SUPPORTED_EXTENSIONS;

/// Validation utilities for input sanitization and edge case handling
#[derive(Debug, Copy, Clone)]
pub struct InputValidator;

impl InputValidator {
    /// Validate contact name
    pub fn validate_contact_name(name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(anyhow!("Contact name cannot be empty"));
        }

        if name.chars().count() > 100 {
            return Err(anyhow!("Contact name too long (max 100 characters)"));
        }

        if name.contains('\0') || name.contains('\r') || name.contains('\n') {
            return Err(anyhow!("Contact name contains invalid characters"));
        }

        Ok(())
    }

    /// Validate phone number format
    ///
    /// Accepts international (`+55 11 99999-0000`) and local
    /// (`(11) 99999-0000`) notations.
    pub fn validate_phone(phone: &str) -> Result<()> {
        let phone = phone.trim();
        if phone.is_empty() {
            return Err(anyhow!("Phone number cannot be empty"));
        }

        if let Some(c) = phone
            .chars()
            .find(|c| !(c.is_ascii_digit() || matches!(c, '+' | '-' | '(' | ')' | ' ' | '.')))
        {
            return Err(anyhow!("Phone number contains invalid character '{c}'"));
        }

        if phone.rfind('+').is_some_and(|pos| pos > 0) {
            return Err(anyhow!("'+' is only allowed at the start of a phone number"));
        }

        let digits = phone.chars().filter(char::is_ascii_digit).count();
        if !(8..=15).contains(&digits) {
            return Err(anyhow!("Phone number must be between 8 and 15 digits"));
        }

        Ok(())
    }

    /// Strip formatting from a valid phone number, keeping a leading `+`
    #[must_use]
    pub fn normalize_phone(phone: &str) -> String {
        let phone = phone.trim();
        let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
        if phone.starts_with('+') {
            format!("+{digits}")
        } else {
            digits
        }
    }

    /// Validate email format
    pub fn validate_email(email: &str) -> Result<()> {
        if email.trim().is_empty() {
            return Err(anyhow!("Email cannot be empty"));
        }

        if email.len() > 254 {
            return Err(anyhow!("Email too long (max 254 characters)"));
        }

        let Some((local_part, domain_part)) = email.split_once('@') else {
            return Err(anyhow!("Email must contain @ symbol"));
        };

        if domain_part.contains('@') {
            return Err(anyhow!("Email must have exactly one @ symbol"));
        }

        if local_part.is_empty() || local_part.len() > 64 {
            return Err(anyhow!("Email local part invalid"));
        }

        if domain_part.is_empty() || !domain_part.contains('.') {
            return Err(anyhow!("Email domain invalid"));
        }

        Ok(())
    }

    /// Validate a spreadsheet to import: must exist and have a supported extension
    pub fn validate_spreadsheet_path(path: &Path) -> Result<()> {
        Self::validate_file_path(path)?;

        if !path.is_file() {
            return Err(anyhow!("Spreadsheet not found: {}", path.display()));
        }

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
            return Err(anyhow!(
                "Unsupported spreadsheet type '{}'. Supported: {}",
                extension,
                SUPPORTED_EXTENSIONS.join(", ")
            ));
        }

        Ok(())
    }

    /// Validate the output path of a generated SQL script
    pub fn validate_script_path(path: &Path) -> Result<()> {
        Self::validate_file_path(path)?;

        if path.is_dir() {
            return Err(anyhow!("Script path is a directory: {}", path.display()));
        }

        let is_sql = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("sql"));
        if !is_sql {
            return Err(anyhow!("Script path must end in .sql"));
        }

        Ok(())
    }

    /// Validate file path
    pub fn validate_file_path(path: &Path) -> Result<()> {
        let path_str = path.to_string_lossy();
        if path_str.trim().is_empty() {
            return Err(anyhow!("File path cannot be empty"));
        }

        // Path traversal
        if path
            .components()
            .any(|c| matches!(c, std::path::Component::ParentDir))
            || path_str.starts_with('~')
        {
            return Err(anyhow!(
                "File path contains potentially dangerous components"
            ));
        }

        if path_str.len() > 4096 {
            return Err(anyhow!("File path too long (max 4096 characters)"));
        }

        Ok(())
    }

    /// Validate batch size for processing
    pub fn validate_batch_size(batch_size: usize) -> Result<()> {
        if batch_size == 0 {
            return Err(anyhow!("Batch size must be greater than 0"));
        }

        if batch_size > 10_000 {
            return Err(anyhow!("Batch size too large (max 10,000)"));
        }

        Ok(())
    }

    /// Validate the retention period used when purging feedback
    pub fn validate_retention_days(days: u32) -> Result<()> {
        if days == 0 {
            return Err(anyhow!("Retention must be at least 1 day"));
        }

        if days > 365 * 20 {
            return Err(anyhow!("Retention too long (max 20 years)"));
        }

        Ok(())
    }

    /// Sanitize text input
    #[must_use]
    pub fn sanitize_text(text: &str) -> String {
        text.chars()
            .filter(|c| !c.is_control() || *c == '\n' || *c == '\t' || *c == '\r')
            .collect::<String>()
            .trim()
            .to_string()
    }

    /// Validate database URL
    pub fn validate_database_url(url: &str) -> Result<()> {
        if url.trim().is_empty() {
            return Err(anyhow!("Database URL cannot be empty"));
        }

        if !url.starts_with("sqlite:") {
            return Err(anyhow!("Only SQLite databases are supported"));
        }

        if url.len() > 1000 {
            return Err(anyhow!("Database URL too long"));
        }

        Ok(())
    }
}
