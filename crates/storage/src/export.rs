//! Schema and data export
//!
//! Walks a store and emits the statements that rebuild it. Output is
//! deterministic: tables are visited in name order, each followed by its
//! indices, then views. Rows are emitted in storage order. Triggers close
//! the data script so replaying the rows never fires them.
//!
//! Values are written as literals that SQLite parses back to the identical
//! stored value:
//!
//! | Storage class | Literal |
//! |---------------|---------|
//! | NULL | `NULL` |
//! | INTEGER | `42` |
//! | REAL | `0.1`, `1e16`, `9e999` for infinity |
//! | TEXT | `'it''s'`, or `CAST(X'..' AS TEXT)` for bytes that are not plain UTF-8 |
//! | BLOB | `X'00ff'` |

use rusqlite::types::ValueRef;
use rusqlite::Connection;
use std::fmt::Write as _;
use vitanet_core::{BundleError, Phase, Result};

const TABLES_QUERY: &str = "SELECT name, sql FROM sqlite_master \
     WHERE type = 'table' AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\' AND sql IS NOT NULL \
     ORDER BY name";

const INDICES_QUERY: &str = "SELECT name, sql FROM sqlite_master \
     WHERE type = 'index' AND tbl_name = ?1 AND sql IS NOT NULL \
     ORDER BY name";

const VIEWS_QUERY: &str = "SELECT name, sql FROM sqlite_master \
     WHERE type = 'view' AND sql IS NOT NULL ORDER BY name";

const TRIGGERS_QUERY: &str = "SELECT name, sql FROM sqlite_master \
     WHERE type = 'trigger' AND sql IS NOT NULL ORDER BY name";

const COLUMNS_QUERY: &str = "SELECT name FROM pragma_table_xinfo(?1) WHERE hidden = 0 ORDER BY cid";

const SEQUENCE_TABLE: &str = "sqlite_sequence";

/// Statements that recreate every table, index and view.
///
/// Triggers are left to [`export_data`].
pub fn export_schema(conn: &Connection) -> Result<Vec<String>> {
    let mut statements = Vec::new();

    for (table, sql) in query_objects(conn, TABLES_QUERY, None, Phase::SchemaExport)? {
        statements.push(sql);
        for (_, index_sql) in
            query_objects(conn, INDICES_QUERY, Some(table.as_str()), Phase::SchemaExport)?
        {
            statements.push(index_sql);
        }
    }
    for (_, sql) in query_objects(conn, VIEWS_QUERY, None, Phase::SchemaExport)? {
        statements.push(sql);
    }

    Ok(statements)
}

/// `INSERT` statements for every row of every table.
///
/// AUTOINCREMENT counters are carried over by rewriting `sqlite_sequence`
/// after all tables. Trigger definitions come last, once every row is in.
pub fn export_data(conn: &Connection) -> Result<Vec<String>> {
    let mut statements = Vec::new();

    for (table, _) in query_objects(conn, TABLES_QUERY, None, Phase::DataExport)? {
        export_table(conn, &table, &mut statements)?;
    }

    if has_table(conn, SEQUENCE_TABLE)? {
        statements.push(format!("DELETE FROM {}", quote_identifier(SEQUENCE_TABLE)));
        export_table(conn, SEQUENCE_TABLE, &mut statements)?;
    }

    for (_, sql) in query_objects(conn, TRIGGERS_QUERY, None, Phase::DataExport)? {
        statements.push(sql);
    }

    Ok(statements)
}

/// Join statements into a script, one `;` terminator each
pub fn to_script(statements: &[String]) -> String {
    let mut script = String::new();
    for statement in statements {
        script.push_str(statement);
        script.push_str(";\n");
    }
    script
}

/// Double-quoted SQL identifier
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// SQL literal that evaluates back to exactly `value`
pub fn sql_literal(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => "NULL".to_string(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => real_literal(f),
        ValueRef::Text(bytes) => match std::str::from_utf8(bytes) {
            Ok(s) if !s.contains('\0') => format!("'{}'", s.replace('\'', "''")),
            _ => format!("CAST({} AS TEXT)", blob_literal(bytes)),
        },
        ValueRef::Blob(bytes) => blob_literal(bytes),
    }
}

fn real_literal(f: f64) -> String {
    if f.is_nan() {
        // SQLite stores NaN as NULL
        return "NULL".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "9e999" } else { "-9e999" }.to_string();
    }
    // Debug gives the shortest string that parses back to the same f64
    let mut s = format!("{:?}", f);
    if !s.contains(|c: char| c == '.' || c == 'e' || c == 'E') {
        s.push_str(".0");
    }
    s
}

fn blob_literal(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2 + 3);
    s.push_str("X'");
    for b in bytes {
        let _ = write!(s, "{:02X}", b);
    }
    s.push('\'');
    s
}

fn export_table(conn: &Connection, table: &str, out: &mut Vec<String>) -> Result<()> {
    let columns = table_columns(conn, table)?;
    if columns.is_empty() {
        return Ok(());
    }

    let quoted_table = quote_identifier(table);
    let column_list = columns
        .iter()
        .map(|c| quote_identifier(c))
        .collect::<Vec<_>>()
        .join(",");
    let select = format!("SELECT {} FROM {}", column_list, quoted_table);

    let err = |e: rusqlite::Error| export_error(Phase::DataExport, &select, e);
    let mut stmt = conn.prepare(&select).map_err(err)?;
    let mut rows = stmt.query([]).map_err(err)?;
    let mut count = 0usize;

    while let Some(row) = rows.next().map_err(err)? {
        let mut values = Vec::with_capacity(columns.len());
        for i in 0..columns.len() {
            values.push(sql_literal(row.get_ref(i).map_err(err)?));
        }
        out.push(format!(
            "INSERT INTO {}({}) VALUES({})",
            quoted_table,
            column_list,
            values.join(",")
        ));
        count += 1;
    }

    tracing::debug!(table, rows = count, "exported table data");
    Ok(())
}

fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let err = |e: rusqlite::Error| export_error(Phase::DataExport, COLUMNS_QUERY, e);
    let mut stmt = conn.prepare(COLUMNS_QUERY).map_err(err)?;
    let columns = stmt
        .query_map([table], |row| row.get::<_, String>(0))
        .map_err(err)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(err)?;
    Ok(columns)
}

fn has_table(conn: &Connection, name: &str) -> Result<bool> {
    let sql = "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1";
    let count: i64 = conn
        .query_row(sql, [name], |r| r.get(0))
        .map_err(|e| export_error(Phase::DataExport, sql, e))?;
    Ok(count > 0)
}

fn query_objects(
    conn: &Connection,
    sql: &str,
    table: Option<&str>,
    phase: Phase,
) -> Result<Vec<(String, String)>> {
    let err = |e: rusqlite::Error| export_error(phase, sql, e);
    let mut stmt = conn.prepare(sql).map_err(err)?;
    let map = |row: &rusqlite::Row<'_>| -> rusqlite::Result<(String, String)> {
        Ok((row.get(0)?, row.get(1)?))
    };
    let rows = match table {
        Some(t) => stmt.query_map([t], map),
        None => stmt.query_map([], map),
    }
    .map_err(err)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(err)
}

fn export_error(phase: Phase, statement: &str, e: rusqlite::Error) -> BundleError {
    BundleError::ExportFailed {
        phase,
        statement: statement.to_string(),
        message: e.to_string(),
    }
}
