//! Error type shared by the helper, the DAOs and the `DaoUtils` wrapper.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaoError {
    /// The wrapper never obtained its DAO. Every operation reports this.
    #[error("dao for table `{table}` is not available")]
    DaoUnavailable { table: &'static str },

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("table `{0}` does not exist")]
    UnknownTable(String),

    #[error("table `{table}` has no column `{column}`")]
    MissingColumn { table: String, column: String },

    /// The id column does not alias the rowid, so generated ids cannot be
    /// read back.
    #[error("column `{column}` of table `{table}` is not its INTEGER PRIMARY KEY")]
    IdNotRowid { table: String, column: String },

    /// A filter named a field the entity does not map.
    #[error("unknown column `{column}` for table `{table}`")]
    UnknownColumn { table: &'static str, column: String },

    #[error("cannot {operation} a `{table}` row without an id")]
    MissingId {
        operation: &'static str,
        table: &'static str,
    },

    #[error("entity for `{table}` produced {actual} values for {expected} columns")]
    ColumnCountMismatch {
        table: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("connection lock poisoned")]
    LockPoisoned,

    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, DaoError>;
