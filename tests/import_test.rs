use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::Connection;
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};
use tempfile::tempdir;

use customer_desk::error::DeskError;
use customer_desk::file_writer::write_summary_json;
use customer_desk::importer::{ImportSession, ImportSummary};
use customer_desk::inference::SqlType;

/// Workbook with two data sheets, one header-only sheet and one blank sheet
fn write_store_workbook(path: &Path) {
    let mut workbook = Workbook::new();
    let date_format = Format::new().set_num_format("yyyy-mm-dd");

    let clientes = workbook.add_worksheet();
    clientes.set_name("Clientes").unwrap();
    for (col, header) in ["Nome", "Idade", "Saldo (R$)", "Ativo", "Cadastro"].iter().enumerate() {
        clientes.write_string(0, col as u16, *header).unwrap();
    }
    let rows = [
        ("Ana", 31.0, 120.5, true, (2024, 1, 5)),
        ("Bruno D'Ávila", 45.0, 0.0, false, (2023, 11, 20)),
        ("Carla", 28.0, 99.9, true, (2024, 2, 29)),
    ];
    for (i, (nome, idade, saldo, ativo, (y, m, d))) in rows.iter().enumerate() {
        let row = i as u32 + 1;
        clientes.write_string(row, 0, *nome).unwrap();
        clientes.write_number(row, 1, *idade).unwrap();
        clientes.write_number(row, 2, *saldo).unwrap();
        clientes.write_boolean(row, 3, *ativo).unwrap();
        let date = ExcelDateTime::from_ymd(*y, *m, *d).unwrap();
        clientes
            .write_datetime_with_format(row, 4, &date, &date_format)
            .unwrap();
    }

    let pedidos = workbook.add_worksheet();
    pedidos.set_name("Pedidos 2024").unwrap();
    for (col, header) in ["ID", "Produto", "produto", "Observação"].iter().enumerate() {
        pedidos.write_string(0, col as u16, *header).unwrap();
    }
    pedidos.write_number(1, 0, 1.0).unwrap();
    pedidos.write_string(1, 1, "Caneta").unwrap();
    pedidos.write_string(1, 2, "Azul").unwrap();
    // Row 2 left blank on purpose
    pedidos.write_number(3, 0, 2.0).unwrap();
    pedidos.write_string(3, 1, "Caderno").unwrap();
    pedidos.write_string(3, 3, "entregar até sexta").unwrap();

    let vazia = workbook.add_worksheet();
    vazia.set_name("Só Cabeçalho").unwrap();
    vazia.write_string(0, 0, "coluna").unwrap();

    let notas = workbook.add_worksheet();
    notas.set_name("Notas").unwrap();

    workbook.save(path).unwrap();
}

fn store_workbook(dir: &Path) -> PathBuf {
    let path = dir.join("loja.xlsx");
    write_store_workbook(&path);
    path
}

fn column_types(conn: &Connection, table: &str) -> Vec<(String, String)> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info(\"{table}\")"))
        .unwrap();
    stmt.query_map([], |row| Ok((row.get(1)?, row.get(2)?)))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap()
}

fn row_count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM \"{table}\""), [], |row| row.get(0))
        .unwrap()
}

#[test]
fn test_one_table_per_non_empty_sheet() {
    let dir = tempdir().expect("Failed to create temp directory");
    let path = store_workbook(dir.path());

    let mut session = ImportSession::builder(&path)
        .database(Connection::open_in_memory().unwrap())
        .build()
        .expect("Failed to read workbook");
    let summary = session.run().expect("Import failed");

    assert_eq!(summary.table_count, 2);
    assert_eq!(
        summary.tables.keys().cloned().collect::<Vec<_>>(),
        ["clientes", "pedidos_2024"]
    );
    assert!(summary.sheet_errors.is_empty());
    assert!(!summary.is_degraded());

    let clientes = &summary.tables["clientes"];
    assert_eq!(clientes.original_name, "Clientes");
    assert_eq!(clientes.row_count, 3);
    assert_eq!(clientes.column_count, 5);
    assert_eq!(
        clientes.column_names,
        ["nome", "idade", "saldo_r", "ativo", "cadastro"]
    );

    let pedidos = &summary.tables["pedidos_2024"];
    assert_eq!(pedidos.row_count, 2);
    assert_eq!(pedidos.column_names, ["id", "produto", "produto_1", "observa_o"]);
    assert_eq!(pedidos.inserted_rows, 2);
}

#[test]
fn test_inferred_column_types() {
    let dir = tempdir().expect("Failed to create temp directory");
    let path = store_workbook(dir.path());

    let mut session = ImportSession::builder(&path)
        .database(Connection::open_in_memory().unwrap())
        .build()
        .unwrap();

    let clientes = session
        .schemas()
        .find(|s| s.table_name == "clientes")
        .cloned()
        .expect("clientes schema");
    let types: Vec<SqlType> = clientes.columns.iter().map(|c| c.sql_type).collect();
    assert_eq!(
        types,
        [
            SqlType::Text,
            SqlType::Integer,
            SqlType::Real,
            SqlType::Boolean,
            SqlType::DateTime
        ]
    );

    session.run().unwrap();
    let conn = session.connection().unwrap();
    assert_eq!(
        column_types(conn, "clientes"),
        [
            ("nome".to_string(), "TEXT".to_string()),
            ("idade".to_string(), "INTEGER".to_string()),
            ("saldo_r".to_string(), "REAL".to_string()),
            ("ativo".to_string(), "BOOLEAN".to_string()),
            ("cadastro".to_string(), "DATETIME".to_string()),
        ]
    );

    let (cadastro, ativo): (String, i64) = conn
        .query_row(
            "SELECT cadastro, ativo FROM clientes WHERE nome = 'Ana'",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(cadastro, "2024-01-05 00:00:00");
    assert_eq!(ativo, 1);

    // Missing cells become NULL
    let observacao: Option<String> = conn
        .query_row("SELECT observa_o FROM pedidos_2024 WHERE id = 1", [], |row| row.get(0))
        .unwrap();
    assert_eq!(observacao, None);
}

#[test]
fn test_reimport_replaces_tables() {
    let dir = tempdir().expect("Failed to create temp directory");
    let path = store_workbook(dir.path());
    let db_path = dir.path().join("imported.db");

    for _ in 0..2 {
        let mut session = ImportSession::builder(&path)
            .database(Connection::open(&db_path).unwrap())
            .build()
            .unwrap();
        session.run().unwrap();
    }

    let conn = Connection::open(&db_path).unwrap();
    assert_eq!(row_count(&conn, "clientes"), 3);
    assert_eq!(row_count(&conn, "pedidos_2024"), 2);
}

#[test]
fn test_colliding_sheet_names_get_unique_tables() {
    let dir = tempdir().expect("Failed to create temp directory");
    let path = dir.path().join("vendas.xlsx");

    let mut workbook = Workbook::new();
    for name in ["Vendas", "vendas!", "2024"] {
        let sheet = workbook.add_worksheet();
        sheet.set_name(name).unwrap();
        sheet.write_string(0, 0, "total").unwrap();
        sheet.write_number(1, 0, 10.0).unwrap();
    }
    workbook.save(&path).unwrap();

    let mut session = ImportSession::builder(&path)
        .database(Connection::open_in_memory().unwrap())
        .build()
        .unwrap();
    let summary = session.run().unwrap();

    assert_eq!(summary.table_count, 3);
    assert!(summary.tables.contains_key("vendas"));
    assert!(summary.tables.contains_key("vendas_1"));
    assert!(summary.tables.contains_key("tab_2024"));
    assert_eq!(summary.tables["vendas_1"].original_name, "vendas!");
}

#[test]
fn test_sql_script_is_deterministic_and_replayable() {
    let dir = tempdir().expect("Failed to create temp directory");
    let path = store_workbook(dir.path());

    let session = ImportSession::builder(&path).build().unwrap();
    let first = session
        .generate_sql_script(Some(&dir.path().join("scripts/first.sql")))
        .unwrap();
    let second = session
        .generate_sql_script(Some(&dir.path().join("scripts/second.sql")))
        .unwrap();

    let strip_timestamp = |script: String| -> Vec<String> {
        script
            .lines()
            .filter(|line| !line.starts_with("-- Generated at:"))
            .map(ToString::to_string)
            .collect()
    };
    let first_script = fs::read_to_string(&first).unwrap();
    let second_script = fs::read_to_string(&second).unwrap();
    assert_eq!(strip_timestamp(first_script.clone()), strip_timestamp(second_script));

    assert!(first_script.starts_with("-- SQL script generated from: loja.xlsx\n"));
    assert!(first_script.contains("-- Tables: 2\n"));
    assert!(first_script.contains("-- Clientes -> clientes\n"));
    assert!(first_script.contains("'Bruno D''Ávila'"));
    assert_eq!(first_script.matches("INSERT INTO").count(), 5);

    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(&first_script).expect("Script should replay");
    assert_eq!(row_count(&conn, "clientes"), 3);
    assert_eq!(row_count(&conn, "pedidos_2024"), 2);
}

#[test]
fn test_default_script_path_next_to_source() {
    let dir = tempdir().expect("Failed to create temp directory");
    let path = store_workbook(dir.path());

    let session = ImportSession::builder(&path).build().unwrap();
    let script = session.generate_sql_script(None).unwrap();

    assert_eq!(script, dir.path().join("loja.sql"));
    assert!(script.exists());
}

#[test]
fn test_script_failure_keeps_imported_tables() {
    let dir = tempdir().expect("Failed to create temp directory");
    let path = store_workbook(dir.path());
    let db_path = dir.path().join("imported.db");

    let mut session = ImportSession::builder(&path)
        .database(Connection::open(&db_path).unwrap())
        .build()
        .unwrap();
    session.run().unwrap();

    // A regular file cannot be used as the script's parent directory
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, "not a directory").unwrap();
    let target = blocker.join("out.sql");

    let err = session.generate_sql_script(Some(&target)).unwrap_err();
    assert!(
        matches!(&err, DeskError::ScriptGeneration { path, .. } if path == &target),
        "unexpected error: {err:?}"
    );
    assert!(!err.is_fatal());

    let conn = session.connection().expect("session keeps its database");
    assert_eq!(row_count(conn, "clientes"), 3);
    assert_eq!(row_count(conn, "pedidos_2024"), 2);

    let reopened = Connection::open(&db_path).unwrap();
    assert_eq!(row_count(&reopened, "clientes"), 3);
    assert_eq!(session.summary().inserted_rows(), 5);
}

#[test]
fn test_missing_and_corrupt_files_are_fatal() {
    let dir = tempdir().expect("Failed to create temp directory");

    let missing = ImportSession::builder(dir.path().join("nao_existe.xlsx")).build();
    assert!(matches!(missing, Err(DeskError::FileRead { .. })));

    let corrupt = dir.path().join("quebrado.xlsx");
    fs::write(&corrupt, b"this is not a zip archive").unwrap();
    let err = ImportSession::builder(&corrupt).build().err().expect("corrupt file");
    assert!(matches!(err, DeskError::FileRead { .. }));
    assert!(err.is_fatal());
}

#[test]
fn test_csv_import() {
    let dir = tempdir().expect("Failed to create temp directory");
    let path = dir.path().join("Estoque Atual.csv");
    fs::write(
        &path,
        "sku,quantidade,preço,ativo,atualizado\n\
         A-1,10,2.5,true,2024-03-01 08:00\n\
         B-2,,3,false,02/03/2024\n",
    )
    .unwrap();

    let mut session = ImportSession::builder(&path)
        .database(Connection::open_in_memory().unwrap())
        .build()
        .unwrap();
    let summary = session.run().unwrap();

    let table = &summary.tables["estoque_atual"];
    assert_eq!(table.column_names, ["sku", "quantidade", "pre_o", "ativo", "atualizado"]);
    assert_eq!(table.inserted_rows, 2);

    let conn = session.connection().unwrap();
    assert_eq!(
        column_types(conn, "estoque_atual")
            .into_iter()
            .map(|(_, ty)| ty)
            .collect::<Vec<_>>(),
        ["TEXT", "INTEGER", "REAL", "BOOLEAN", "DATETIME"]
    );
    let updated: String = conn
        .query_row(
            "SELECT atualizado FROM estoque_atual WHERE sku = 'B-2'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(updated, "2024-03-02 00:00:00");
}

#[test]
fn test_summary_json_round_trip() {
    let dir = tempdir().expect("Failed to create temp directory");
    let path = store_workbook(dir.path());

    let mut session = ImportSession::builder(&path)
        .database(Connection::open_in_memory().unwrap())
        .build()
        .unwrap();
    let summary = session.run().unwrap();

    let json_path = dir.path().join("summary.json");
    write_summary_json(&summary, &json_path).unwrap();

    let parsed: ImportSummary =
        serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(parsed, summary);
    assert_eq!(parsed.inserted_rows(), 5);
}
