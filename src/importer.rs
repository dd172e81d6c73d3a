//! Spreadsheet import sessions.
//!
//! An [`ImportSession`] reads a workbook once, infers one table per non-empty
//! sheet and can then materialize those tables into SQLite, re-emit them as a
//! standalone SQL script, or both. Importing is destructive: an existing table
//! with the same derived name is dropped and recreated.
//!
//! ```no_run
//! use customer_desk::importer::ImportSession;
//! use rusqlite::Connection;
//!
//! let conn = Connection::open("imported.db")?;
//! let mut session = ImportSession::builder("vendas.xlsx")
//!     .database(conn)
//!     .datetime_sample_size(10)
//!     .build()?;
//! let summary = session.run()?;
//! session.generate_sql_script(None)?;
//! println!("{} tables", summary.table_count);
//! # Ok::<(), customer_desk::error::DeskError>(())
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::ImportConfig;
use crate::error::{DeskError, Result};
use crate::file_writer::{self, ScriptTable};
use crate::identifier::{table_identifier, UniqueNames};
use crate::inference::SheetSchema;
use crate::metrics::MetricsCollector;
use crate::workbook::{read_workbook, SheetData, SheetError};

/// Per-table entry of an [`ImportSummary`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSummary {
    /// Sheet name as found in the workbook
    pub original_name: String,
    /// Data rows read from the sheet
    pub row_count: usize,
    /// Columns in the created table
    pub column_count: usize,
    /// Derived column names in sheet order
    pub column_names: Vec<String>,
    /// Rows written to the database by the last insert
    pub inserted_rows: usize,
    /// Rows skipped because they could not be coerced or inserted
    pub failed_rows: usize,
}

/// What the last import run produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    /// Source file name
    pub source: String,
    /// Tables derived from the workbook
    pub table_count: usize,
    /// Entries keyed by derived table name
    pub tables: BTreeMap<String, TableSummary>,
    /// Sheets left out of the import, with the reason
    pub sheet_errors: Vec<SheetError>,
}

impl ImportSummary {
    /// Rows inserted across all tables
    #[must_use]
    pub fn inserted_rows(&self) -> usize {
        self.tables.values().map(|t| t.inserted_rows).sum()
    }

    /// Rows skipped across all tables
    #[must_use]
    pub fn failed_rows(&self) -> usize {
        self.tables.values().map(|t| t.failed_rows).sum()
    }

    /// True when some rows or sheets did not make it into the database
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.failed_rows() > 0 || !self.sheet_errors.is_empty()
    }
}

/// A sheet paired with the table inferred for it
#[derive(Debug, Clone)]
struct ImportedSheet {
    data: SheetData,
    schema: SheetSchema,
    created: bool,
    inserted_rows: usize,
    failed_rows: usize,
}

/// Builder for [`ImportSession`]
pub struct ImportSessionBuilder {
    path: PathBuf,
    database: Option<Connection>,
    datetime_sample_size: usize,
    skip_blank_rows: bool,
}

impl ImportSessionBuilder {
    /// Target database; without one only script generation is available
    #[must_use]
    pub fn database(mut self, conn: Connection) -> Self {
        self.database = Some(conn);
        self
    }

    /// Non-null values inspected when testing a column for datetimes
    #[must_use]
    pub fn datetime_sample_size(mut self, sample_size: usize) -> Self {
        self.datetime_sample_size = sample_size;
        self
    }

    /// Keep or drop rows with no non-empty cell
    #[must_use]
    pub fn skip_blank_rows(mut self, skip: bool) -> Self {
        self.skip_blank_rows = skip;
        self
    }

    /// Apply the import section of the application configuration
    #[must_use]
    pub fn config(self, config: &ImportConfig) -> Self {
        self.datetime_sample_size(config.datetime_sample_size)
            .skip_blank_rows(config.skip_blank_rows)
    }

    /// Read the workbook and infer the schema of every non-empty sheet
    pub fn build(self) -> Result<ImportSession> {
        let workbook = read_workbook(&self.path, self.skip_blank_rows)?;

        let mut table_names = UniqueNames::new();
        let sheets = workbook
            .sheets
            .into_iter()
            .map(|data| {
                let table_name = table_names.assign(&table_identifier(&data.name));
                let schema = SheetSchema::infer(&data, table_name, self.datetime_sample_size);
                debug!(
                    sheet = %schema.original_name,
                    table = %schema.table_name,
                    columns = schema.columns.len(),
                    "Schema inferred"
                );
                ImportedSheet {
                    data,
                    schema,
                    created: false,
                    inserted_rows: 0,
                    failed_rows: 0,
                }
            })
            .collect();

        Ok(ImportSession {
            source: self.path,
            sheets,
            sheet_errors: workbook.errors,
            conn: self.database,
            metrics: MetricsCollector::default(),
        })
    }
}

/// One import of one spreadsheet file
///
/// Sessions own their connection and per-run state; use one session per import.
pub struct ImportSession {
    source: PathBuf,
    sheets: Vec<ImportedSheet>,
    sheet_errors: Vec<SheetError>,
    conn: Option<Connection>,
    metrics: MetricsCollector,
}

impl ImportSession {
    /// Start configuring an import of the spreadsheet at `path`
    #[must_use]
    pub fn builder(path: impl AsRef<Path>) -> ImportSessionBuilder {
        let defaults = ImportConfig::default();
        ImportSessionBuilder {
            path: path.as_ref().to_path_buf(),
            database: None,
            datetime_sample_size: defaults.datetime_sample_size,
            skip_blank_rows: defaults.skip_blank_rows,
        }
    }

    /// Source spreadsheet path
    #[must_use]
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Inferred tables in workbook order
    pub fn schemas(&self) -> impl Iterator<Item = &SheetSchema> {
        self.sheets.iter().map(|sheet| &sheet.schema)
    }

    /// The attached database, if any
    #[must_use]
    pub const fn connection(&self) -> Option<&Connection> {
        self.conn.as_ref()
    }

    /// Drop and recreate one table per sheet, returning the executed DDL
    ///
    /// A sheet whose table cannot be created is reported in the summary and
    /// left out of the insert.
    pub fn create_schema(&mut self) -> Result<Vec<String>> {
        let conn = self.conn.as_ref().ok_or(DeskError::NoDatabase)?;
        let mut statements = Vec::new();

        for sheet in &mut self.sheets {
            let drop = sheet.schema.drop_table_sql();
            let create = sheet.schema.create_table_sql();

            match conn.execute_batch(&format!("{drop};\n{create};")) {
                Ok(()) => {
                    sheet.created = true;
                    debug!(table = %sheet.schema.table_name, "Table created");
                    statements.push(drop);
                    statements.push(create);
                }
                Err(e) => {
                    warn!(
                        sheet = %sheet.schema.original_name,
                        error = %e,
                        "Failed to create table, sheet skipped"
                    );
                    sheet.created = false;
                    self.sheet_errors.push(SheetError {
                        sheet: sheet.schema.original_name.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(tables = statements.len() / 2, "Schema created");
        Ok(statements)
    }

    /// Append every data row to its table, returning the number inserted
    ///
    /// Rows that fail coercion or insertion are logged, counted and skipped.
    pub fn insert_rows(&mut self) -> Result<usize> {
        let conn = self.conn.as_mut().ok_or(DeskError::NoDatabase)?;
        let mut total = 0;

        for sheet in self.sheets.iter_mut().filter(|sheet| sheet.created) {
            let tx = conn.transaction()?;
            let (inserted, failed) = {
                let mut stmt = tx.prepare(&sheet.schema.insert_sql())?;
                let mut inserted = 0;
                let mut failed = 0;

                for (index, row) in sheet.data.rows.iter().enumerate() {
                    let outcome = sheet.schema.coerce_row(row).and_then(|values| {
                        stmt.execute(rusqlite::params_from_iter(values.iter()))
                            .map_err(|e| e.to_string())
                    });

                    match outcome {
                        Ok(_) => inserted += 1,
                        Err(reason) => {
                            let error = DeskError::RowInsert {
                                table: sheet.schema.table_name.clone(),
                                row: index,
                                reason,
                            };
                            warn!(error = %error, "Skipping row");
                            failed += 1;
                        }
                    }
                }
                (inserted, failed)
            };
            tx.commit()?;

            info!(
                table = %sheet.schema.table_name,
                inserted,
                failed,
                "Rows inserted"
            );
            sheet.inserted_rows = inserted;
            sheet.failed_rows = failed;
            total += inserted;
        }

        Ok(total)
    }

    /// Create the schema and insert all rows
    pub fn run(&mut self) -> Result<ImportSummary> {
        let start = Instant::now();

        self.create_schema()?;
        self.insert_rows()?;

        let summary = self.summary();
        self.metrics.record_import(
            summary.table_count,
            summary.inserted_rows(),
            summary.failed_rows(),
            start.elapsed(),
        );
        info!(
            source = %summary.source,
            tables = summary.table_count,
            inserted = summary.inserted_rows(),
            failed = summary.failed_rows(),
            "Import finished"
        );
        Ok(summary)
    }

    /// Write the import as a standalone SQL script
    ///
    /// Defaults to the source path with a `.sql` extension. Writing the script
    /// never touches the database.
    pub fn generate_sql_script(&self, output_path: Option<&Path>) -> Result<PathBuf> {
        let path = output_path.map_or_else(|| self.source.with_extension("sql"), Path::to_path_buf);

        let tables: Vec<ScriptTable<'_>> = self
            .sheets
            .iter()
            .map(|sheet| ScriptTable {
                schema: &sheet.schema,
                rows: sheet
                    .data
                    .rows
                    .iter()
                    .map(|row| sheet.schema.coerce_row(row))
                    .collect(),
            })
            .collect();

        let script_error = |reason: String| DeskError::ScriptGeneration {
            path: path.clone(),
            reason,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| script_error(e.to_string()))?;
        }

        let bytes = file_writer::write_sql_script(&path, &self.source_name(), Utc::now(), &tables)
            .map_err(|e| script_error(e.to_string()))?;

        self.metrics.record_script_written(bytes);
        info!(path = %path.display(), bytes, "SQL script written");
        Ok(path)
    }

    /// Read-only report of the tables and the last insert
    #[must_use]
    pub fn summary(&self) -> ImportSummary {
        let tables: BTreeMap<String, TableSummary> = self
            .sheets
            .iter()
            .map(|sheet| {
                (
                    sheet.schema.table_name.clone(),
                    TableSummary {
                        original_name: sheet.schema.original_name.clone(),
                        row_count: sheet.data.row_count(),
                        column_count: sheet.schema.columns.len(),
                        column_names: sheet.schema.column_names(),
                        inserted_rows: sheet.inserted_rows,
                        failed_rows: sheet.failed_rows,
                    },
                )
            })
            .collect();

        ImportSummary {
            source: self.source_name(),
            table_count: tables.len(),
            tables,
            sheet_errors: self.sheet_errors.clone(),
        }
    }

    fn source_name(&self) -> String {
        self.source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Open (creating if needed) the SQLite file that receives imported tables
pub fn open_import_database(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(Connection::open(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = fs::File::create(&path).expect("create csv");
        file.write_all(content.as_bytes()).expect("write csv");
        path
    }

    #[test]
    fn test_operations_without_database_fail() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_csv(dir.path(), "pedidos.csv", "id,valor\n1,10.5\n");

        let mut session = ImportSession::builder(&path).build().expect("build");
        assert!(matches!(session.create_schema(), Err(DeskError::NoDatabase)));
        assert!(matches!(session.insert_rows(), Err(DeskError::NoDatabase)));

        let script = session
            .generate_sql_script(Some(&dir.path().join("out/pedidos.sql")))
            .expect("script without database");
        assert!(script.exists());
    }

    #[test]
    fn test_bad_datetime_row_is_skipped_and_counted() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_csv(
            dir.path(),
            "agenda.csv",
            "quando,cliente\n2024-01-01,Ana\n2024-01-02,Bia\nsem data,Caio\n",
        );

        let mut session = ImportSession::builder(&path)
            .database(Connection::open_in_memory().expect("memory db"))
            .datetime_sample_size(2)
            .build()
            .expect("build");
        let summary = session.run().expect("run");

        let table = &summary.tables["agenda"];
        assert_eq!(table.row_count, 3);
        assert_eq!(table.inserted_rows, 2);
        assert_eq!(table.failed_rows, 1);
        assert!(summary.is_degraded());

        let conn = session.connection().expect("connection");
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM \"agenda\"", [], |row| row.get(0))
            .expect("count");
        assert_eq!(count, 2);
    }
}
