//! Append-only SQLite sink for the clean table.

use crate::domain::model::Table;
use crate::utils::error::Result;
use rusqlite::{params_from_iter, Connection};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[derive(Debug, Clone)]
pub struct SqliteSink {
    path: PathBuf,
}

impl SqliteSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Result<Connection> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Connection::open(&self.path)?)
    }

    /// Appends every row of `table` to `table_name`, creating the table and
    /// any missing columns first. All columns are TEXT. Returns rows inserted.
    pub fn append(&self, table_name: &str, table: &Table) -> Result<usize> {
        if table.columns.is_empty() || table.is_empty() {
            return Ok(0);
        }

        let mut conn = self.open()?;
        let quoted_table = quote_ident(table_name);

        let column_defs: Vec<String> = table
            .columns
            .iter()
            .map(|c| format!("{} TEXT", quote_ident(c)))
            .collect();
        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {} ({})",
                quoted_table,
                column_defs.join(", ")
            ),
            [],
        )?;

        // SQLite 欄位名稱不分大小寫
        let mut existing = existing_columns(&conn, &quoted_table)?;
        for column in &table.columns {
            if !existing.insert(column.to_ascii_lowercase()) {
                continue;
            }
            tracing::debug!("Adding column {} to {}", column, table_name);
            conn.execute(
                &format!(
                    "ALTER TABLE {} ADD COLUMN {} TEXT",
                    quoted_table,
                    quote_ident(column)
                ),
                [],
            )?;
        }

        let placeholders: Vec<String> = (1..=table.columns.len())
            .map(|i| format!("?{}", i))
            .collect();
        let insert_sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quoted_table,
            table
                .columns
                .iter()
                .map(|c| quote_ident(c))
                .collect::<Vec<_>>()
                .join(", "),
            placeholders.join(", ")
        );

        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(&insert_sql)?;
            for row in &table.rows {
                stmt.execute(params_from_iter(row.iter()))?;
            }
        }
        tx.commit()?;

        Ok(table.len())
    }
}

/// Lowercased column names of an existing table.
fn existing_columns(conn: &Connection, quoted_table: &str) -> Result<HashSet<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quoted_table))?;
    let names = stmt
        .query_map([], |row| {
            row.get::<_, String>(1).map(|name| name.to_ascii_lowercase())
        })?
        .collect::<std::result::Result<HashSet<_>, _>>()?;
    Ok(names)
}
