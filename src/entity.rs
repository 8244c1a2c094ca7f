use rusqlite::Row;

use crate::sqlite::{TableDefinition, Value};

/// Mapping between a Rust record and one row of a table.
///
/// Rows handed to [`Entity::from_row`] are selected as the id column followed
/// by [`Entity::columns`] in declaration order, so index `0` is the id and
/// index `n + 1` is `columns()[n]`. [`Entity::values`] must line up with
/// `columns()` the same way.
///
/// # Example
///
/// ```
/// use rust_sqlite_dao::{ColumnConstraint, ColumnDefinition, DataType, Entity, TableDefinition, Value};
///
/// struct Note {
///     id: Option<i64>,
///     title: String,
/// }
///
/// impl Entity for Note {
///     fn table_name() -> &'static str { "notes" }
///     fn id_column() -> &'static str { "id" }
///     fn columns() -> &'static [&'static str] { &["title"] }
///     fn table_definition() -> TableDefinition {
///         TableDefinition::new("notes")
///             .column(ColumnDefinition::new("id", DataType::Integer)
///                 .constraint(ColumnConstraint::PrimaryKey))
///             .column(ColumnDefinition::new("title", DataType::Text))
///     }
///     fn id(&self) -> Option<i64> { self.id }
///     fn set_id(&mut self, id: i64) { self.id = Some(id); }
///     fn values(&self) -> Vec<Value> { vec![self.title.clone().into()] }
///     fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
///         Ok(Note { id: row.get(0)?, title: row.get(1)? })
///     }
/// }
/// ```
pub trait Entity: Sized {
    fn table_name() -> &'static str;

    /// Integer primary key column.
    fn id_column() -> &'static str;

    /// Mapped columns, excluding the id column.
    fn columns() -> &'static [&'static str];

    fn table_definition() -> TableDefinition;

    /// `None` until the row has been created.
    fn id(&self) -> Option<i64>;

    fn set_id(&mut self, id: i64);

    fn values(&self) -> Vec<Value>;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

    /// Whether `field` names the id column or a mapped column.
    fn has_column(field: &str) -> bool {
        field == Self::id_column() || Self::columns().contains(&field)
    }
}
