// Common fixtures for DAO integration tests

use rust_sqlite_dao::{
    ColumnConstraint, ColumnDefinition, DataType, DatabaseHelper, DefaultValue, Entity,
    IndexDefinition, Schema, SqliteConfig, TableDefinition, Value,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub id: Option<i64>,
    pub title: String,
    pub body: Option<String>,
    pub pinned: bool,
    pub score: f64,
}

impl Note {
    pub fn new(title: &str) -> Self {
        Self {
            id: None,
            title: title.to_string(),
            body: None,
            pinned: false,
            score: 0.0,
        }
    }

    #[allow(dead_code)]
    pub fn with_body(mut self, body: &str) -> Self {
        self.body = Some(body.to_string());
        self
    }

    #[allow(dead_code)]
    pub fn pinned(mut self) -> Self {
        self.pinned = true;
        self
    }
}

impl Entity for Note {
    fn table_name() -> &'static str {
        "notes"
    }

    fn id_column() -> &'static str {
        "id"
    }

    fn columns() -> &'static [&'static str] {
        &["title", "body", "pinned", "score"]
    }

    fn table_definition() -> TableDefinition {
        TableDefinition::new("notes")
            .column(
                ColumnDefinition::new("id", DataType::Integer)
                    .constraint(ColumnConstraint::PrimaryKey)
                    .constraint(ColumnConstraint::AutoIncrement),
            )
            .column(
                ColumnDefinition::new("title", DataType::Text).constraint(ColumnConstraint::NotNull),
            )
            .column(ColumnDefinition::new("body", DataType::Text))
            .column(
                ColumnDefinition::new("pinned", DataType::Integer)
                    .constraint(ColumnConstraint::NotNull)
                    .default_value(DefaultValue::Integer(0)),
            )
            .column(
                ColumnDefinition::new("score", DataType::Real)
                    .constraint(ColumnConstraint::NotNull)
                    .default_value(DefaultValue::Real(0.0)),
            )
            .index(IndexDefinition {
                name: "idx_notes_title".to_string(),
                columns: vec!["title".to_string()],
                unique: false,
            })
    }

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.title.clone().into(),
            self.body.clone().into(),
            self.pinned.into(),
            self.score.into(),
        ]
    }

    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Note {
            id: row.get(0)?,
            title: row.get(1)?,
            body: row.get(2)?,
            pinned: row.get(3)?,
            score: row.get(4)?,
        })
    }
}

/// Plain rowid table, no AUTOINCREMENT.
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub id: Option<i64>,
    pub name: String,
}

impl Entity for Tag {
    fn table_name() -> &'static str {
        "tags"
    }

    fn id_column() -> &'static str {
        "id"
    }

    fn columns() -> &'static [&'static str] {
        &["name"]
    }

    fn table_definition() -> TableDefinition {
        TableDefinition::new("tags")
            .column(
                ColumnDefinition::new("id", DataType::Integer)
                    .constraint(ColumnConstraint::PrimaryKey),
            )
            .column(
                ColumnDefinition::new("name", DataType::Text)
                    .constraint(ColumnConstraint::NotNull)
                    .constraint(ColumnConstraint::Unique),
            )
    }

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn values(&self) -> Vec<Value> {
        vec![self.name.clone().into()]
    }

    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Tag {
            id: row.get(0)?,
            name: row.get(1)?,
        })
    }
}

/// Maps a table that is never created.
#[derive(Debug, Clone, PartialEq)]
pub struct Ghost {
    pub id: Option<i64>,
}

impl Entity for Ghost {
    fn table_name() -> &'static str {
        "ghosts"
    }

    fn id_column() -> &'static str {
        "id"
    }

    fn columns() -> &'static [&'static str] {
        &[]
    }

    fn table_definition() -> TableDefinition {
        TableDefinition::new("ghosts").column(
            ColumnDefinition::new("id", DataType::Integer).constraint(ColumnConstraint::PrimaryKey),
        )
    }

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn values(&self) -> Vec<Value> {
        Vec::new()
    }

    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Ghost { id: row.get(0)? })
    }
}

#[allow(dead_code)]
pub fn notes_helper() -> DatabaseHelper {
    let schema = Schema::new().add_table(Note::table_definition());
    DatabaseHelper::open(&SqliteConfig::in_memory(schema)).expect("Failed to open database")
}

#[allow(dead_code)]
pub fn notes_and_tags_helper() -> DatabaseHelper {
    let schema = Schema::new()
        .add_table(Note::table_definition())
        .add_table(Tag::table_definition());
    DatabaseHelper::open(&SqliteConfig::in_memory(schema)).expect("Failed to open database")
}
