//! Reading spreadsheets into typed sheets.
//!
//! Excel and OpenDocument files go through `calamine`; `.csv` files are read
//! as a single sheet named after the file stem. In both cases the first row is
//! the header and the remaining rows are data.

use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{DeskError, Result};
use crate::inference::CellValue;

/// Extensions `read_workbook` accepts
pub const SUPPORTED_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods", "csv"];

/// A sheet with its header row split from the data rows
#[derive(Debug, Clone, PartialEq)]
pub struct SheetData {
    /// Sheet name as found in the workbook
    pub name: String,
    /// Header text per column; blank headers are empty strings
    pub headers: Vec<String>,
    /// Data rows, each padded to the header width
    pub rows: Vec<Vec<CellValue>>,
}

impl SheetData {
    /// Number of data rows
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// A sheet that could not be read and was left out of the import
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetError {
    /// Sheet name as found in the workbook
    pub sheet: String,
    /// Why the sheet was skipped
    pub reason: String,
}

/// Sheets read from one spreadsheet file
#[derive(Debug, Clone)]
pub struct Workbook {
    /// File the sheets were read from
    pub path: PathBuf,
    /// Non-empty sheets in workbook order
    pub sheets: Vec<SheetData>,
    /// Sheets skipped because they could not be read
    pub errors: Vec<SheetError>,
}

/// Read every non-empty sheet of a spreadsheet
///
/// Fails with [`DeskError::FileRead`] when the file itself is missing, corrupt
/// or of an unsupported type. Sheets without data rows are skipped.
pub fn read_workbook(path: &Path, skip_blank_rows: bool) -> Result<Workbook> {
    if !path.is_file() {
        return Err(file_read_error(path, "file not found"));
    }

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    let (sheets, errors) = if extension == "csv" {
        (read_csv_sheet(path, skip_blank_rows)?, Vec::new())
    } else {
        read_spreadsheet(path, skip_blank_rows)?
    };

    info!(
        path = %path.display(),
        sheets = sheets.len(),
        skipped = errors.len(),
        "Spreadsheet read"
    );

    Ok(Workbook {
        path: path.to_path_buf(),
        sheets,
        errors,
    })
}

fn read_spreadsheet(
    path: &Path,
    skip_blank_rows: bool,
) -> Result<(Vec<SheetData>, Vec<SheetError>)> {
    let mut workbook = open_workbook_auto(path).map_err(|e| file_read_error(path, e))?;

    let mut sheets = Vec::new();
    let mut errors = Vec::new();

    for name in workbook.sheet_names() {
        let range = match workbook.worksheet_range(&name) {
            Ok(range) => range,
            Err(e) => {
                warn!(sheet = %name, error = %e, "Skipping unreadable sheet");
                errors.push(SheetError {
                    sheet: name,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let rows = range
            .rows()
            .map(|row| row.iter().map(cell_from_data).collect())
            .collect();

        if let Some(sheet) = build_sheet(name, rows, skip_blank_rows) {
            sheets.push(sheet);
        }
    }

    Ok((sheets, errors))
}

fn read_csv_sheet(path: &Path, skip_blank_rows: bool) -> Result<Vec<SheetData>> {
    let name = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or_default()
        .to_string();

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| file_read_error(path, e))?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| file_read_error(path, e))?;
        rows.push(record.iter().map(cell_from_text).collect());
    }

    Ok(build_sheet(name, rows, skip_blank_rows).into_iter().collect())
}

/// Split the header row off and normalize row widths
fn build_sheet(
    name: String,
    rows: Vec<Vec<CellValue>>,
    skip_blank_rows: bool,
) -> Option<SheetData> {
    let mut rows = rows.into_iter();
    let Some(header_row) = rows.next() else {
        info!(sheet = %name, "Skipping empty sheet");
        return None;
    };

    let mut data: Vec<Vec<CellValue>> = rows
        .filter(|row| !skip_blank_rows || row.iter().any(|cell| !cell.is_null()))
        .collect();

    let width = data
        .iter()
        .map(Vec::len)
        .chain(std::iter::once(header_row.len()))
        .max()
        .unwrap_or(0);

    if data.is_empty() || width == 0 {
        info!(sheet = %name, "Skipping sheet without data rows");
        return None;
    }

    let mut headers: Vec<String> = header_row.iter().map(ToString::to_string).collect();
    headers.resize(width, String::new());
    for row in &mut data {
        row.resize(width, CellValue::Null);
    }

    debug!(sheet = %name, rows = data.len(), columns = width, "Sheet loaded");

    Some(SheetData {
        name,
        headers,
        rows: data,
    })
}

fn cell_from_data(cell: &Data) -> CellValue {
    match cell {
        Data::Empty | Data::Error(_) => CellValue::Null,
        Data::Int(i) => CellValue::Int(*i),
        Data::Float(f) if f.is_nan() => CellValue::Null,
        Data::Float(f) => CellValue::Float(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::String(s) if s.trim().is_empty() => CellValue::Null,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map_or_else(|| CellValue::Float(dt.as_f64()), CellValue::DateTime),
        Data::DateTimeIso(s) => crate::inference::parse_datetime_text(s)
            .map_or_else(|| CellValue::Text(s.clone()), CellValue::DateTime),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}

/// Type a CSV field the way a dataframe reader would
///
/// Fields with a leading `+` or a leading zero (phones, zip codes, ids) stay text.
fn cell_from_text(field: &str) -> CellValue {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        return CellValue::Null;
    }
    if !looks_like_code(trimmed) {
        if let Ok(i) = trimmed.parse::<i64>() {
            return CellValue::Int(i);
        }
        if let Ok(f) = trimmed.parse::<f64>() {
            if f.is_nan() {
                return CellValue::Null;
            }
            if f.is_finite() {
                return CellValue::Float(f);
            }
        }
    }
    match trimmed.to_lowercase().as_str() {
        "true" => CellValue::Bool(true),
        "false" => CellValue::Bool(false),
        _ => CellValue::Text(field.to_string()),
    }
}

fn looks_like_code(text: &str) -> bool {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some('+'), _) => true,
        (Some('0'), Some(c)) => c.is_ascii_digit(),
        _ => false,
    }
}

fn file_read_error(path: &Path, reason: impl std::fmt::Display) -> DeskError {
    DeskError::FileRead {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}
