//! File output for imports.
//!
//! This module writes the standalone SQL script that mirrors an import, and the
//! JSON report of an import run.

use crate::error::Result;
use crate::importer::ImportSummary;
use crate::inference::{quote_identifier, sql_literal, SheetSchema};
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// A table to render into a SQL script.
///
/// Rows hold the coerced values, or the reason a row could not be coerced.
pub struct ScriptTable<'a> {
    /// Table name, columns and types
    pub schema: &'a SheetSchema,
    /// Coerced values per data row, in sheet order
    pub rows: Vec<std::result::Result<Vec<Value>, String>>,
}

/// Write a self-contained SQL script for the given tables.
///
/// Layout: a header comment block (source, generation time, table count), then
/// per table a `original -> derived` comment, `DROP`/`CREATE TABLE`, one
/// `INSERT` per row and a closing comment. Only the generation time line
/// changes between two runs over the same input.
///
/// # Returns
///
/// Number of bytes written
pub fn write_sql_script(
    file_path: &Path,
    source_name: &str,
    generated_at: DateTime<Utc>,
    tables: &[ScriptTable<'_>],
) -> Result<u64> {
    let file = File::create(file_path)?;
    let mut writer = BufWriter::new(file);

    render_sql_script(&mut writer, source_name, generated_at, tables)?;

    writer.flush()?;
    let size = writer.get_ref().metadata()?.len();
    Ok(size)
}

/// Render the script into any writer
pub fn render_sql_script<W: Write>(
    writer: &mut W,
    source_name: &str,
    generated_at: DateTime<Utc>,
    tables: &[ScriptTable<'_>],
) -> Result<()> {
    writeln!(writer, "-- SQL script generated from: {source_name}")?;
    writeln!(
        writer,
        "-- Generated at: {}",
        generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    )?;
    writeln!(writer, "-- Tables: {}", tables.len())?;
    writeln!(writer)?;

    for table in tables {
        let schema = table.schema;
        let table_name = quote_identifier(&schema.table_name);
        let columns = schema
            .columns
            .iter()
            .map(|c| quote_identifier(&c.name))
            .collect::<Vec<_>>()
            .join(", ");

        writeln!(writer, "-- {} -> {}", schema.original_name, schema.table_name)?;
        writeln!(writer, "{};", schema.drop_table_sql())?;
        writeln!(writer, "{};", schema.create_table_sql())?;

        let mut written = 0usize;
        for (index, row) in table.rows.iter().enumerate() {
            match row {
                Ok(values) => {
                    let literals = values.iter().map(sql_literal).collect::<Vec<_>>().join(", ");
                    writeln!(
                        writer,
                        "INSERT INTO {table_name} ({columns}) VALUES ({literals});"
                    )?;
                    written += 1;
                }
                Err(reason) => {
                    // Keep the comment on one line whatever the cell contained
                    let reason = reason.replace(['\r', '\n'], " ");
                    writeln!(writer, "-- row {index} skipped: {reason}")?;
                }
            }
        }

        writeln!(writer, "-- end of {} ({written} rows)", schema.table_name)?;
        writeln!(writer)?;
    }

    Ok(())
}

/// Write an import summary as pretty-printed JSON.
pub fn write_summary_json(summary: &ImportSummary, file_path: &Path) -> Result<()> {
    let file = File::create(file_path)?;
    let writer = BufWriter::new(file);

    serde_json::to_writer_pretty(writer, summary)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::{CellValue, SheetSchema};
    use crate::workbook::SheetData;
    use chrono::TimeZone;

    fn schema() -> SheetSchema {
        let sheet = SheetData {
            name: "Itens do Pedido".to_string(),
            headers: vec!["Produto".to_string(), "Qtd".to_string()],
            rows: vec![vec![CellValue::Text("caneta".into()), CellValue::Int(2)]],
        };
        SheetSchema::infer(&sheet, "itens_do_pedido".to_string(), 10)
    }

    #[test]
    fn test_render_sql_script_layout() {
        let schema = schema();
        let tables = [ScriptTable {
            schema: &schema,
            rows: vec![
                Ok(vec![Value::Text("D'água".into()), Value::Integer(2)]),
                Err("column qtd: bad".to_string()),
                Ok(vec![Value::Null, Value::Integer(5)]),
            ],
        }];
        let generated_at = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();

        let mut out = Vec::new();
        render_sql_script(&mut out, "pedidos.xlsx", generated_at, &tables).unwrap();
        let script = String::from_utf8(out).unwrap();

        assert!(script.starts_with("-- SQL script generated from: pedidos.xlsx\n"));
        assert!(script.contains("-- Generated at: 2026-01-02 03:04:05 UTC\n"));
        assert!(script.contains("-- Tables: 1\n"));
        assert!(script.contains("-- Itens do Pedido -> itens_do_pedido\n"));
        assert!(script.contains(
            "INSERT INTO \"itens_do_pedido\" (\"produto\", \"qtd\") VALUES ('D''água', 2);"
        ));
        assert!(script.contains("VALUES (NULL, 5);"));
        assert!(script.contains("-- row 1 skipped: column qtd: bad\n"));
        assert!(script.contains("-- end of itens_do_pedido (2 rows)\n"));
    }
}
