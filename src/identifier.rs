//! SQL-safe identifiers derived from sheet names and column headers.
//!
//! Cleaning is deterministic: the same label always yields the same identifier,
//! and [`UniqueNames`] resolves collisions in first-occurrence order.

use std::collections::HashSet;

/// Placeholder for a missing or blank column header
pub const COLUMN_EMPTY: &str = "coluna_vazia";
/// Placeholder for a header with no usable characters
pub const COLUMN_UNNAMED: &str = "coluna_sem_nome";
/// Placeholder for a sheet name with no usable characters
pub const TABLE_UNNAMED: &str = "tabela_sem_nome";

/// What an identifier names; decides the digit prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
    /// A table derived from a sheet
    Table,
    /// A column derived from a header cell
    Column,
}

impl IdentifierKind {
    /// Prefix added to identifiers that would start with a digit
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Table => "tab_",
            Self::Column => "col_",
        }
    }
}

/// Normalize a label into a lowercase `[a-z0-9_]` identifier
///
/// Every character outside `[A-Za-z0-9_]` becomes `_`, runs of `_` collapse,
/// leading and trailing `_` are stripped. An empty result is replaced by
/// `fallback`; a result starting with a digit gets the kind's prefix.
#[must_use]
pub fn clean_identifier(name: &str, fallback: &str, kind: IdentifierKind) -> String {
    let mut cleaned = String::with_capacity(name.len());
    for c in name.trim().chars() {
        let c = if c.is_ascii_alphanumeric() { c } else { '_' };
        if c == '_' && cleaned.ends_with('_') {
            continue;
        }
        cleaned.push(c.to_ascii_lowercase());
    }

    let cleaned = cleaned.trim_matches('_');
    if cleaned.is_empty() {
        return fallback.to_string();
    }
    if cleaned.starts_with(|c: char| c.is_ascii_digit()) {
        return format!("{}{cleaned}", kind.prefix());
    }
    cleaned.to_string()
}

/// Identifier for a column header, choosing the right placeholder
#[must_use]
pub fn column_identifier(header: &str) -> String {
    let fallback = if header.trim().is_empty() {
        COLUMN_EMPTY
    } else {
        COLUMN_UNNAMED
    };
    clean_identifier(header, fallback, IdentifierKind::Column)
}

/// Identifier for a sheet name
#[must_use]
pub fn table_identifier(sheet_name: &str) -> String {
    clean_identifier(sheet_name, TABLE_UNNAMED, IdentifierKind::Table)
}

/// Hands out unique names, suffixing repeats with `_1`, `_2`, ...
#[derive(Debug, Default)]
pub struct UniqueNames {
    taken: HashSet<String>,
}

impl UniqueNames {
    /// An empty set of taken names
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve `base`, or the first free `base_N` if it is already taken
    pub fn assign(&mut self, base: &str) -> String {
        if self.taken.insert(base.to_string()) {
            return base.to_string();
        }

        let mut n = 1usize;
        loop {
            let candidate = format!("{base}_{n}");
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}
