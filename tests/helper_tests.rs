mod common;

use anyhow::Result;
use rust_sqlite_dao::{
    ColumnDefinition, DaoError, DataType, DatabaseHelper, Entity, Params, QueryOperator, Schema,
    SqlQuery, SqliteConfig, TableDefinition, Value,
};
use tempfile::NamedTempFile;

use common::{notes_helper, Ghost, Note, Tag};

// Helper function to create a temporary file-based database config
fn temp_config() -> (SqliteConfig, NamedTempFile) {
    let temp_file = NamedTempFile::new().unwrap();
    let path = temp_file.path().to_str().unwrap().to_string();
    let schema = Schema::new().add_table(Note::table_definition());
    (SqliteConfig::new(path, schema), temp_file)
}

#[test]
fn rows_survive_reopening_a_file_database() -> Result<()> {
    let (config, _file) = temp_config();

    {
        let helper = DatabaseHelper::open(&config)?;
        let dao = helper.get_dao::<Note>()?;
        dao.create(&mut Note::new("persisted"))?;
    }

    // Reopening runs CREATE TABLE IF NOT EXISTS again without touching data.
    let helper = DatabaseHelper::open(&config)?;
    let all = helper.get_dao::<Note>()?.query_for_all()?;
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].title, "persisted");
    Ok(())
}

#[test]
fn open_from_toml_config() -> Result<()> {
    let config = SqliteConfig::from_toml_str(
        r#"
        db_path = ":memory:"
        foreign_keys = true
        busy_timeout_ms = 250

        [[schema.tables]]
        name = "tags"

        [[schema.tables.columns]]
        name = "id"
        data_type = "integer"
        constraints = ["primary_key"]

        [[schema.tables.columns]]
        name = "name"
        data_type = "text"
        constraints = ["not_null", "unique"]
        "#,
    )?;
    let helper = DatabaseHelper::open(&config)?;
    assert!(helper.table_exists("tags")?);

    let tags = helper.get_dao::<Tag>()?;
    tags.create(&mut Tag {
        id: None,
        name: "sqlite".to_string(),
    })?;
    let dup = tags.create(&mut Tag {
        id: None,
        name: "sqlite".to_string(),
    });
    assert!(matches!(dup, Err(DaoError::Sqlite(_))));

    let fk = tags.query_raw(&SqlQuery::new("PRAGMA foreign_keys"))?;
    assert_eq!(fk, vec![vec![Value::Integer(1)]]);
    Ok(())
}

#[test]
fn get_dao_requires_the_table() {
    let helper = notes_helper();
    let err = helper.get_dao::<Ghost>().unwrap_err();
    assert!(matches!(err, DaoError::UnknownTable(ref t) if t == "ghosts"));
}

#[test]
fn get_dao_requires_every_mapped_column() -> Result<()> {
    let conn = rusqlite::Connection::open_in_memory()?;
    let helper = DatabaseHelper::from_connection(conn);
    helper.create_table(
        &TableDefinition::new("notes")
            .column(ColumnDefinition::new("id", DataType::Integer))
            .column(ColumnDefinition::new("title", DataType::Text)),
    )?;

    let err = helper.get_dao::<Note>().unwrap_err();
    assert!(matches!(
        err,
        DaoError::MissingColumn { ref table, ref column } if table == "notes" && column == "body"
    ));
    Ok(())
}

#[test]
fn create_table_for_entity() -> Result<()> {
    let helper = notes_helper();
    assert!(!helper.table_exists("tags")?);
    helper.create_table_for::<Tag>()?;
    assert!(helper.table_exists("tags")?);
    assert!(helper.get_dao::<Tag>().is_ok());
    Ok(())
}

#[test]
fn dao_single_row_operations() -> Result<()> {
    let helper = notes_helper();
    let dao = helper.get_dao::<Note>()?;

    let mut note = Note::new("one");
    assert_eq!(dao.create(&mut note)?, 1);
    let id = note.id.unwrap();
    assert!(dao.id_exists(id)?);
    assert!(!dao.id_exists(id + 1)?);

    assert_eq!(dao.delete_by_id(id)?, 1);
    assert!(!dao.id_exists(id)?);
    assert_eq!(dao.count_of()?, 0);
    Ok(())
}

#[test]
fn query_builder_operators_and_paging() -> Result<()> {
    let helper = notes_helper();
    let dao = helper.get_dao::<Note>()?;
    let mut batch: Vec<Note> = ["alpha", "beta", "gamma", "delta"]
        .iter()
        .enumerate()
        .map(|(i, title)| {
            let mut n = Note::new(title);
            n.score = i as f64;
            n
        })
        .collect();
    dao.create_all(&mut batch)?;

    let high = dao
        .query_builder()
        .where_op("score", QueryOperator::GreaterThanOrEqual(2.0.into()))
        .order_by("score", true)
        .query()?;
    assert_eq!(
        high.iter().map(|n| n.title.as_str()).collect::<Vec<_>>(),
        vec!["gamma", "delta"]
    );

    let like = dao
        .query_builder()
        .where_op("title", QueryOperator::Like("%a".to_string()))
        .order_by("title", true)
        .query()?;
    assert_eq!(like.len(), 4);

    let second_page = dao
        .query_builder()
        .order_by("id", true)
        .offset(2)
        .query()?;
    assert_eq!(second_page.len(), 2);
    assert_eq!(second_page[0].title, "gamma");

    let picked = dao
        .query_builder()
        .where_op(
            "title",
            QueryOperator::In(vec!["beta".into(), "delta".into()]),
        )
        .where_op("score", QueryOperator::NotEqual(1.0.into()))
        .query_first()?;
    assert_eq!(picked.map(|n| n.title), Some("delta".to_string()));

    let none = dao
        .query_builder()
        .where_op("title", QueryOperator::In(Vec::new()))
        .query()?;
    assert!(none.is_empty());

    let err = dao.query_builder().order_by("rank", false).query().unwrap_err();
    assert!(matches!(err, DaoError::UnknownColumn { .. }));
    Ok(())
}

#[test]
fn raw_statements_bind_named_parameters() -> Result<()> {
    let helper = notes_helper();
    let dao = helper.get_dao::<Note>()?;
    dao.create_all(&mut [Note::new("a"), Note::new("b")])?;

    let changed = dao.execute_raw(
        &SqlQuery::new("UPDATE notes SET body = :body WHERE title = :title").with_params(
            Params::new()
                .with_value("body", "filled")
                .with_value(":title", "a"),
        ),
    )?;
    assert_eq!(changed, 1);

    let rows = dao.query_raw(&SqlQuery::new(
        "SELECT title, body, pinned FROM notes ORDER BY title",
    ))?;
    assert_eq!(
        rows,
        vec![
            vec![
                Value::Text("a".into()),
                Value::Text("filled".into()),
                Value::Integer(0)
            ],
            vec![Value::Text("b".into()), Value::Null, Value::Integer(0)],
        ]
    );
    Ok(())
}

#[test]
fn dao_clear_table_targets_its_own_table() -> Result<()> {
    let helper = notes_helper();
    let dao = helper.get_dao::<Note>()?;
    dao.create_all(&mut [Note::new("a"), Note::new("b")])?;

    assert_eq!(dao.clear_table()?, 2);
    assert_eq!(dao.count_of()?, 0);
    Ok(())
}

#[test]
fn mismatched_values_are_rejected() -> Result<()> {
    struct Short {
        id: Option<i64>,
    }

    impl Entity for Short {
        fn table_name() -> &'static str {
            "notes"
        }
        fn id_column() -> &'static str {
            "id"
        }
        fn columns() -> &'static [&'static str] {
            &["title"]
        }
        fn table_definition() -> TableDefinition {
            Note::table_definition()
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
            Ok(Short { id: row.get(0)? })
        }
    }

    let helper = notes_helper();
    let dao = helper.get_dao::<Short>()?;
    let err = dao.create(&mut Short { id: None }).unwrap_err();
    assert!(matches!(
        err,
        DaoError::ColumnCountMismatch {
            expected: 1,
            actual: 0,
            ..
        }
    ));
    Ok(())
}

#[test]
fn get_dao_requires_id_to_alias_the_rowid() -> Result<()> {
    let plain_id = || {
        TableDefinition::new("notes")
            .column(ColumnDefinition::new("id", DataType::Integer))
            .column(ColumnDefinition::new("title", DataType::Text))
            .column(ColumnDefinition::new("body", DataType::Text))
            .column(ColumnDefinition::new("pinned", DataType::Integer))
            .column(ColumnDefinition::new("score", DataType::Real))
    };

    let no_key = DatabaseHelper::from_connection(rusqlite::Connection::open_in_memory()?);
    no_key.create_table(&plain_id())?;
    let err = no_key.get_dao::<Note>().unwrap_err();
    assert!(matches!(
        err,
        DaoError::IdNotRowid { ref table, ref column } if table == "notes" && column == "id"
    ));
    let notes = rust_sqlite_dao::DaoUtils::<Note>::new(&no_key);
    assert!(!notes.is_valid());

    let mut composite = plain_id();
    composite.primary_key = vec!["id".to_string(), "title".to_string()];
    let composite_key = DatabaseHelper::from_connection(rusqlite::Connection::open_in_memory()?);
    composite_key.create_table(&composite)?;
    assert!(matches!(
        composite_key.get_dao::<Note>(),
        Err(DaoError::IdNotRowid { .. })
    ));

    let mut text_key = plain_id();
    text_key.columns[0] = ColumnDefinition::new("id", DataType::Text)
        .constraint(rust_sqlite_dao::ColumnConstraint::PrimaryKey);
    let text_helper = DatabaseHelper::from_connection(rusqlite::Connection::open_in_memory()?);
    text_helper.create_table(&text_key)?;
    assert!(matches!(
        text_helper.get_dao::<Note>(),
        Err(DaoError::IdNotRowid { .. })
    ));
    Ok(())
}

#[test]
fn table_lookup_ignores_case() -> Result<()> {
    let helper = notes_helper();
    assert!(helper.table_exists("NOTES")?);
    assert!(!helper.table_exists("SQLITE_MASTER")?);
    Ok(())
}
