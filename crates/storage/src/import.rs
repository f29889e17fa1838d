//! Transactional replay of schema and data scripts
//!
//! Each script runs inside one transaction. SQLite's own parser splits the
//! script, so trigger bodies and literals containing `;` are safe. On the
//! first failing statement the transaction rolls back and the error names the
//! script, the statement's position, and its text.

use rusqlite::{Batch, Connection};
use vitanet_core::{BundleError, Result};

/// Script name reported for schema failures
pub const SCHEMA_SCRIPT: &str = "schema.sql";

/// Script name reported for data failures
pub const DATA_SCRIPT: &str = "data.sql";

const MAX_STATEMENT_CHARS: usize = 200;

/// Run a schema script against `conn`. Returns the number of statements run.
pub fn import_schema(conn: &mut Connection, script: &str) -> Result<usize> {
    apply_script(conn, SCHEMA_SCRIPT, script)
}

/// Run a data script against `conn`. Returns the number of statements run.
///
/// Foreign key enforcement is switched off first so rows can arrive in
/// table-name order regardless of references between tables.
pub fn import_data(conn: &mut Connection, script: &str) -> Result<usize> {
    conn.execute_batch("PRAGMA foreign_keys = OFF")
        .map_err(|e| import_error(DATA_SCRIPT, 0, "PRAGMA foreign_keys = OFF", e))?;
    apply_script(conn, DATA_SCRIPT, script)
}

fn apply_script(conn: &mut Connection, script_name: &str, script: &str) -> Result<usize> {
    let tx = conn
        .transaction()
        .map_err(|e| import_error(script_name, 0, "BEGIN", e))?;

    let executed = {
        let mut batch = Batch::new(&tx, script);
        let mut ordinal = 0usize;
        loop {
            let next = batch
                .next()
                .map_err(|e| import_error(script_name, ordinal + 1, "", e))?;
            let Some(mut stmt) = next else {
                break;
            };
            ordinal += 1;
            let text = stmt.expanded_sql().unwrap_or_default();
            stmt.execute([])
                .map_err(|e| import_error(script_name, ordinal, statement_text(&text), e))?;
        }
        ordinal
    };

    tx.commit()
        .map_err(|e| import_error(script_name, executed, "COMMIT", e))?;
    tracing::debug!(script = script_name, statements = executed, "script applied");
    Ok(executed)
}

fn import_error(script: &str, ordinal: usize, statement: &str, e: rusqlite::Error) -> BundleError {
    BundleError::ImportFailed {
        script: script.to_string(),
        ordinal,
        statement: truncate(statement),
        message: e.to_string(),
    }
}

/// Statement text without the whitespace and `;` SQLite keeps around it
fn statement_text(sql: &str) -> &str {
    sql.trim().trim_end_matches(';').trim_end()
}

fn truncate(statement: &str) -> String {
    if statement.chars().count() <= MAX_STATEMENT_CHARS {
        return statement.to_string();
    }
    let head: String = statement.chars().take(MAX_STATEMENT_CHARS).collect();
    format!("{}...", head)
}
