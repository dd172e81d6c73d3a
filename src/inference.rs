//! Column type inference and value coercion for imported sheets.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rusqlite::types::Value;
use serde::{Deserialize, Serialize};

use crate::identifier::{column_identifier, UniqueNames};
use crate::workbook::SheetData;

/// Storage format for DATETIME values, both in SQLite and in scripts
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Datetime layouts accepted in text cells, tried in order
const DATETIME_LAYOUTS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

const DATE_LAYOUTS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];

/// A typed spreadsheet cell
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Empty cell
    Null,
    /// Whole number
    Int(i64),
    /// Number with a fraction, or too large for `i64`
    Float(f64),
    /// Boolean cell
    Bool(bool),
    /// Date or datetime, without time zone
    DateTime(NaiveDateTime),
    /// Anything else, kept verbatim
    Text(String),
}

impl CellValue {
    /// True for an empty cell
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Float cells holding a whole number count as integers
    fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Float(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => Some(*f as i64),
            _ => None,
        }
    }

    const fn is_numeric(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Float(_))
    }

    fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Self::DateTime(dt) => Some(*dt),
            Self::Text(s) => parse_datetime_text(s),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::DateTime(dt) => write!(f, "{}", dt.format(DATETIME_FORMAT)),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Column types emitted in `CREATE TABLE`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SqlType {
    /// All values are whole numbers
    Integer,
    /// Numeric values with at least one fraction
    Real,
    /// Sampled values all parse as datetimes
    DateTime,
    /// Stored as 1/0
    Boolean,
    /// Mixed or textual values, and empty columns
    Text,
}

impl SqlType {
    /// Type name as written in DDL
    #[must_use]
    pub const fn as_sql(&self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::DateTime => "DATETIME",
            Self::Boolean => "BOOLEAN",
            Self::Text => "TEXT",
        }
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Parse the text datetime layouts found in exported spreadsheets
#[must_use]
pub fn parse_datetime_text(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }

    DATETIME_LAYOUTS
        .iter()
        .find_map(|layout| NaiveDateTime::parse_from_str(text, layout).ok())
        .or_else(|| {
            DATE_LAYOUTS
                .iter()
                .find_map(|layout| NaiveDate::parse_from_str(text, layout).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// Infer the SQL type of a column from its cells
///
/// Only non-null cells are inspected. Integer is tested before real, and
/// datetime (on the first `sample_size` values) before boolean.
#[must_use]
pub fn infer_column_type(values: &[CellValue], sample_size: usize) -> SqlType {
    let non_null: Vec<&CellValue> = values.iter().filter(|v| !v.is_null()).collect();
    if non_null.is_empty() {
        return SqlType::Text;
    }

    if non_null.iter().all(|v| v.as_integer().is_some()) {
        return SqlType::Integer;
    }
    if non_null.iter().all(|v| v.is_numeric()) {
        return SqlType::Real;
    }
    if non_null
        .iter()
        .take(sample_size.max(1))
        .all(|v| v.as_datetime().is_some())
    {
        return SqlType::DateTime;
    }
    if non_null.iter().all(|v| matches!(v, CellValue::Bool(_))) {
        return SqlType::Boolean;
    }

    SqlType::Text
}

/// Convert a cell to the SQLite value stored in a column of the given type
pub fn coerce_value(cell: &CellValue, sql_type: SqlType) -> Result<Value, String> {
    if cell.is_null() {
        return Ok(Value::Null);
    }

    match sql_type {
        SqlType::Integer => cell
            .as_integer()
            .map(Value::Integer)
            .ok_or_else(|| format!("'{cell}' is not an integer")),
        SqlType::Real => match cell {
            CellValue::Int(i) => Ok(Value::Real(*i as f64)),
            CellValue::Float(f) => Ok(Value::Real(*f)),
            other => Err(format!("'{other}' is not a number")),
        },
        SqlType::Boolean => match cell {
            CellValue::Bool(b) => Ok(Value::Integer(i64::from(*b))),
            other => Err(format!("'{other}' is not a boolean")),
        },
        SqlType::DateTime => cell
            .as_datetime()
            .map(|dt| Value::Text(dt.format(DATETIME_FORMAT).to_string()))
            .ok_or_else(|| format!("'{cell}' is not a recognizable datetime")),
        SqlType::Text => Ok(Value::Text(cell.to_string())),
    }
}

/// Render a SQLite value as a SQL literal
#[must_use]
pub fn sql_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Real(f) => {
            if f.fract() == 0.0 && f.is_finite() {
                format!("{f:.1}")
            } else {
                f.to_string()
            }
        }
        Value::Text(s) => format!("'{}'", s.replace('\'', "''")),
        Value::Blob(bytes) => {
            let hex: String = bytes.iter().map(|b| format!("{b:02X}")).collect();
            format!("X'{hex}'")
        }
    }
}

/// Quote an identifier for SQLite
#[must_use]
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// One column of an inferred table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Header text as found in the sheet
    pub original_name: String,
    /// Cleaned, deduplicated column name
    pub name: String,
    /// Inferred storage type
    pub sql_type: SqlType,
    /// Zero-based position in the sheet
    pub position: usize,
}

/// The table derived from one sheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetSchema {
    /// Sheet name as found in the workbook
    pub original_name: String,
    /// Cleaned, deduplicated table name
    pub table_name: String,
    /// Columns in sheet order
    pub columns: Vec<ColumnSpec>,
}

impl SheetSchema {
    /// Derive column names and types for a sheet
    #[must_use]
    pub fn infer(sheet: &SheetData, table_name: String, sample_size: usize) -> Self {
        let mut names = UniqueNames::new();
        let columns = sheet
            .headers
            .iter()
            .enumerate()
            .map(|(position, header)| {
                let values: Vec<CellValue> = sheet
                    .rows
                    .iter()
                    .map(|row| row.get(position).cloned().unwrap_or(CellValue::Null))
                    .collect();
                ColumnSpec {
                    original_name: header.clone(),
                    name: names.assign(&column_identifier(header)),
                    sql_type: infer_column_type(&values, sample_size),
                    position,
                }
            })
            .collect();

        Self {
            original_name: sheet.name.clone(),
            table_name,
            columns,
        }
    }

    /// Derived column names in sheet order
    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// `DROP TABLE IF EXISTS` for this table
    #[must_use]
    pub fn drop_table_sql(&self) -> String {
        format!("DROP TABLE IF EXISTS {}", quote_identifier(&self.table_name))
    }

    /// `CREATE TABLE` with every column and its inferred type
    #[must_use]
    pub fn create_table_sql(&self) -> String {
        let columns = self
            .columns
            .iter()
            .map(|c| format!("{} {}", quote_identifier(&c.name), c.sql_type))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "CREATE TABLE {} ({columns})",
            quote_identifier(&self.table_name)
        )
    }

    /// Parameterized insert, one `?N` per column
    #[must_use]
    pub fn insert_sql(&self) -> String {
        let columns = self
            .columns
            .iter()
            .map(|c| quote_identifier(&c.name))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=self.columns.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "INSERT INTO {} ({columns}) VALUES ({placeholders})",
            quote_identifier(&self.table_name)
        )
    }

    /// Coerce a data row to column values
    pub fn coerce_row(&self, row: &[CellValue]) -> Result<Vec<Value>, String> {
        self.columns
            .iter()
            .map(|column| {
                let cell = row.get(column.position).unwrap_or(&CellValue::Null);
                coerce_value(cell, column.sql_type)
                    .map_err(|reason| format!("column {}: {reason}", column.name))
            })
            .collect()
    }
}
