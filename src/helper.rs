use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info};

use crate::dao::Dao;
use crate::entity::Entity;
use crate::error::{DaoError, Result};
use crate::sqlite::{quote_ident, SqliteConfig, TableDefinition};

/// Owns the database connection and hands out typed DAOs.
///
/// Cloning a helper is cheap; clones share the same connection.
#[derive(Debug, Clone)]
pub struct DatabaseHelper {
    conn: Arc<Mutex<Connection>>,
}

impl DatabaseHelper {
    /// Open the configured database and create every table in its schema.
    pub fn open(config: &SqliteConfig) -> Result<Self> {
        let conn = if config.is_in_memory() {
            Connection::open_in_memory()?
        } else {
            Connection::open(&config.db_path)?
        };
        if config.foreign_keys {
            conn.pragma_update(None, "foreign_keys", true)?;
        }
        if let Some(ms) = config.busy_timeout_ms {
            conn.busy_timeout(Duration::from_millis(ms))?;
        }

        let helper = Self::from_connection(conn);
        for table in &config.schema.tables {
            helper.create_table(table)?;
        }
        info!(
            path = %config.db_path,
            tables = config.schema.tables.len(),
            "opened sqlite database"
        );
        Ok(helper)
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    pub fn create_table(&self, table: &TableDefinition) -> Result<()> {
        let conn = lock(&self.conn)?;
        conn.execute_batch(&table.create_sql())?;
        debug!(table = %table.name, "created table");
        Ok(())
    }

    pub fn create_table_for<T: Entity>(&self) -> Result<()> {
        self.create_table(&T::table_definition())
    }

    pub fn table_exists(&self, name: &str) -> Result<bool> {
        let conn = lock(&self.conn)?;
        Ok(canonical_table_name(&conn, name)?.is_some())
    }

    /// Build the DAO for `T`.
    ///
    /// Fails when the entity's table is absent, lacks any column the entity
    /// maps, or its id column is not the table's `INTEGER PRIMARY KEY`.
    pub fn get_dao<T: Entity>(&self) -> Result<Dao<T>> {
        let table = T::table_name();
        {
            let conn = lock(&self.conn)?;
            let canonical = canonical_table_name(&conn, table)?
                .ok_or_else(|| DaoError::UnknownTable(table.to_string()))?;
            let present = table_columns(&conn, &canonical)?;
            let expected = std::iter::once(T::id_column()).chain(T::columns().iter().copied());
            for column in expected {
                if !present.iter().any(|p| p.name.eq_ignore_ascii_case(column)) {
                    return Err(DaoError::MissingColumn {
                        table: table.to_string(),
                        column: column.to_string(),
                    });
                }
            }

            // Generated ids are read back from the rowid, so the id column
            // must alias it: the sole primary key column, declared INTEGER.
            let key: Vec<&TableColumn> = present.iter().filter(|c| c.pk > 0).collect();
            let aliases_rowid = matches!(
                key.as_slice(),
                [only] if only.name.eq_ignore_ascii_case(T::id_column())
                    && only.declared_type.eq_ignore_ascii_case("INTEGER")
            );
            if !aliases_rowid {
                return Err(DaoError::IdNotRowid {
                    table: table.to_string(),
                    column: T::id_column().to_string(),
                });
            }
        }
        Ok(Dao::new(Arc::clone(&self.conn)))
    }

    /// Delete every row of `name` and reset its autoincrement counter.
    ///
    /// `name` must be an existing user table; anything else is rejected
    /// before any statement runs.
    pub fn clear_table(&self, name: &str) -> Result<usize> {
        let mut conn = lock(&self.conn)?;
        clear_table_on(&mut conn, name)
    }
}

pub(crate) fn lock(conn: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>> {
    conn.lock().map_err(|_| DaoError::LockPoisoned)
}

/// The stored spelling of table `name`, matched case-insensitively the way
/// SQLite resolves identifiers.
fn canonical_table_name(conn: &Connection, name: &str) -> Result<Option<String>> {
    let canonical = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1 COLLATE NOCASE",
            [name],
            |row| row.get(0),
        )
        .optional()?;
    Ok(canonical)
}

struct TableColumn {
    name: String,
    declared_type: String,
    pk: i64,
}

fn table_columns(conn: &Connection, table: &str) -> Result<Vec<TableColumn>> {
    let mut stmt = conn.prepare("SELECT name, type, pk FROM pragma_table_info(?1)")?;
    let columns = stmt
        .query_map([table], |row| {
            Ok(TableColumn {
                name: row.get(0)?,
                declared_type: row.get(1)?,
                pk: row.get(2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(columns)
}

pub(crate) fn clear_table_on(conn: &mut Connection, name: &str) -> Result<usize> {
    // sqlite_ tables are internal bookkeeping, sqlite_sequence included.
    let table = match canonical_table_name(conn, name)? {
        Some(table) if !table.to_ascii_lowercase().starts_with("sqlite_") => table,
        _ => return Err(DaoError::UnknownTable(name.to_string())),
    };

    let tx = conn.transaction()?;
    let deleted = tx.execute(&format!("DELETE FROM {}", quote_ident(&table)), [])?;
    if canonical_table_name(&tx, "sqlite_sequence")?.is_some() {
        let reset = tx.execute("UPDATE sqlite_sequence SET seq = 0 WHERE name = ?1", [&table])?;
        if reset == 0 {
            debug!(table = %table, "no autoincrement sequence to reset");
        }
    }
    tx.commit()?;

    debug!(table = %table, rows = deleted, "cleared table");
    Ok(deleted)
}
