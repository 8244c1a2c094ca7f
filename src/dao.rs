use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{params_from_iter, Connection};
use tracing::debug;

use crate::entity::Entity;
use crate::error::{DaoError, Result};
use crate::helper::{clear_table_on, lock};
use crate::sqlite::{quote_ident, Query, QueryOperator, SqlQuery, Value};

/// SQLite caps bound parameters per statement; batch deletes stay under it.
const DELETE_CHUNK: usize = 500;

/// Outcome of [`Dao::create_or_update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateOrUpdateStatus {
    pub created: bool,
    pub updated: bool,
    pub rows_changed: usize,
}

/// Typed CRUD handle for one entity's table.
///
/// Obtained from [`crate::DatabaseHelper::get_dao`]. Every call locks the
/// shared connection for its duration.
pub struct Dao<T> {
    conn: Arc<Mutex<Connection>>,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for Dao<T> {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T: Entity> fmt::Debug for Dao<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dao").field("table", &T::table_name()).finish()
    }
}

impl<T: Entity> Dao<T> {
    pub(crate) fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            conn,
            _entity: PhantomData,
        }
    }

    pub fn table_name(&self) -> &'static str {
        T::table_name()
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        lock(&self.conn)
    }

    // -- create ---------------------------------------------------------

    /// Insert one row. A generated id is written back into `entity`.
    pub fn create(&self, entity: &mut T) -> Result<usize> {
        let conn = self.conn()?;
        let (rows, generated) = insert_row(&conn, entity)?;
        if let Some(id) = generated {
            entity.set_id(id);
        }
        debug!(table = T::table_name(), rows, "created row");
        Ok(rows)
    }

    /// Insert every entity in one transaction. Generated ids are written back
    /// only once the transaction commits.
    pub fn create_all(&self, entities: &mut [T]) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let mut rows = 0;
        let mut generated = Vec::with_capacity(entities.len());
        for entity in entities.iter() {
            let (n, id) = insert_row(&tx, entity)?;
            rows += n;
            generated.push(id);
        }
        tx.commit()?;

        for (entity, id) in entities.iter_mut().zip(generated) {
            if let Some(id) = id {
                entity.set_id(id);
            }
        }
        debug!(table = T::table_name(), rows, "created rows");
        Ok(rows)
    }

    /// Update the row when `entity` has an id that exists, create it otherwise.
    pub fn create_or_update(&self, entity: &mut T) -> Result<CreateOrUpdateStatus> {
        let conn = self.conn()?;
        if let Some(id) = entity.id() {
            if id_exists_on::<T>(&conn, id)? {
                let rows = update_row(&conn, entity)?;
                debug!(table = T::table_name(), id, rows, "updated row");
                return Ok(CreateOrUpdateStatus {
                    created: false,
                    updated: true,
                    rows_changed: rows,
                });
            }
        }

        let (rows, generated) = insert_row(&conn, entity)?;
        if let Some(id) = generated {
            entity.set_id(id);
        }
        debug!(table = T::table_name(), rows, "created row");
        Ok(CreateOrUpdateStatus {
            created: true,
            updated: false,
            rows_changed: rows,
        })
    }

    // -- read -----------------------------------------------------------

    pub fn query_for_all(&self) -> Result<Vec<T>> {
        self.select(&Query::new(), &[], None, None)
    }

    pub fn query_for_id(&self, id: i64) -> Result<Option<T>> {
        let query = Query::new().with_condition(T::id_column(), QueryOperator::Equal(id.into()));
        Ok(self.select(&query, &[], Some(1), None)?.into_iter().next())
    }

    pub fn id_exists(&self, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        id_exists_on::<T>(&conn, id)
    }

    pub fn count_of(&self) -> Result<u64> {
        let conn = self.conn()?;
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(T::table_name()));
        let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    /// Rows whose fields equal every value in `fields`. A `Null` value
    /// matches `IS NULL`; an empty map matches every row.
    pub fn query_for_field_values(&self, fields: &HashMap<String, Value>) -> Result<Vec<T>> {
        let mut names: Vec<&String> = fields.keys().collect();
        names.sort();
        let query = names.into_iter().fold(Query::new(), |query, name| {
            query.with_condition(name, QueryOperator::Equal(fields[name].clone()))
        });
        self.query(&query)
    }

    pub fn query(&self, query: &Query) -> Result<Vec<T>> {
        self.select(query, &[], None, None)
    }

    pub fn query_builder(&self) -> QueryBuilder<'_, T> {
        QueryBuilder {
            dao: self,
            query: Query::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    fn select(
        &self,
        query: &Query,
        order_by: &[(String, bool)],
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<Vec<T>> {
        for field in query.fields().chain(order_by.iter().map(|(f, _)| f.as_str())) {
            if !T::has_column(field) {
                return Err(DaoError::UnknownColumn {
                    table: T::table_name(),
                    column: field.to_string(),
                });
            }
        }

        let (clause, values) = query.to_where_clause();
        let mut sql = format!("{} WHERE {clause}", select_sql::<T>());
        if !order_by.is_empty() {
            let terms: Vec<String> = order_by
                .iter()
                .map(|(field, asc)| {
                    format!("{} {}", quote_ident(field), if *asc { "ASC" } else { "DESC" })
                })
                .collect();
            sql.push_str(&format!(" ORDER BY {}", terms.join(", ")));
        }
        match (limit, offset) {
            (Some(limit), Some(offset)) => sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}")),
            (Some(limit), None) => sql.push_str(&format!(" LIMIT {limit}")),
            // OFFSET is only valid after LIMIT
            (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {offset}")),
            (None, None) => {}
        }

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), |row| T::from_row(row))?
            .collect::<rusqlite::Result<Vec<T>>>()?;
        debug!(table = T::table_name(), rows = rows.len(), "queried rows");
        Ok(rows)
    }

    // -- update ---------------------------------------------------------

    pub fn update(&self, entity: &T) -> Result<usize> {
        let conn = self.conn()?;
        let rows = update_row(&conn, entity)?;
        debug!(table = T::table_name(), rows, "updated row");
        Ok(rows)
    }

    // -- delete ---------------------------------------------------------

    pub fn delete(&self, entity: &T) -> Result<usize> {
        let id = require_id::<T>(entity, "delete")?;
        self.delete_by_id(id)
    }

    pub fn delete_by_id(&self, id: i64) -> Result<usize> {
        let conn = self.conn()?;
        let sql = format!(
            "DELETE FROM {} WHERE {} = ?1",
            quote_ident(T::table_name()),
            quote_ident(T::id_column())
        );
        let rows = conn.execute(&sql, [id])?;
        debug!(table = T::table_name(), id, rows, "deleted row");
        Ok(rows)
    }

    /// Delete every entity in one transaction. All entities must have ids.
    pub fn delete_all(&self, entities: &[T]) -> Result<usize> {
        let ids = entities
            .iter()
            .map(|e| require_id::<T>(e, "delete"))
            .collect::<Result<Vec<i64>>>()?;
        if ids.is_empty() {
            return Ok(0);
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let mut rows = 0;
        for chunk in ids.chunks(DELETE_CHUNK) {
            let marks = vec!["?"; chunk.len()].join(", ");
            let sql = format!(
                "DELETE FROM {} WHERE {} IN ({marks})",
                quote_ident(T::table_name()),
                quote_ident(T::id_column())
            );
            rows += tx.execute(&sql, params_from_iter(chunk.iter()))?;
        }
        tx.commit()?;
        debug!(table = T::table_name(), rows, "deleted rows");
        Ok(rows)
    }

    /// Delete every row of this table and reset its autoincrement counter.
    pub fn clear_table(&self) -> Result<usize> {
        let mut conn = self.conn()?;
        clear_table_on(&mut conn, T::table_name())
    }

    // -- raw ------------------------------------------------------------

    /// Run a statement that returns no rows, binding named parameters.
    pub fn execute_raw(&self, query: &SqlQuery) -> Result<usize> {
        let conn = self.conn()?;
        let named = query.params.as_named();
        let rows = conn.execute(&query.statement, named.as_slice())?;
        Ok(rows)
    }

    /// Run a statement and return every row as its column values.
    pub fn query_raw(&self, query: &SqlQuery) -> Result<Vec<Vec<Value>>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&query.statement)?;
        let width = stmt.column_count();
        let named = query.params.as_named();
        let mut rows = stmt.query(named.as_slice())?;

        let mut results = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = Vec::with_capacity(width);
            for i in 0..width {
                record.push(row.get::<_, Value>(i)?);
            }
            results.push(record);
        }
        Ok(results)
    }
}

/// Fluent filter for one DAO's table.
pub struct QueryBuilder<'a, T> {
    dao: &'a Dao<T>,
    query: Query,
    order_by: Vec<(String, bool)>, // (field, is_ascending)
    limit: Option<u32>,
    offset: Option<u32>,
}

impl<'a, T: Entity> QueryBuilder<'a, T> {
    pub fn where_eq(self, field: &str, value: impl Into<Value>) -> Self {
        self.where_op(field, QueryOperator::Equal(value.into()))
    }

    pub fn where_op(mut self, field: &str, op: QueryOperator) -> Self {
        self.query = self.query.with_condition(field, op);
        self
    }

    pub fn order_by(mut self, field: &str, ascending: bool) -> Self {
        self.order_by.push((field.to_string(), ascending));
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn query(self) -> Result<Vec<T>> {
        self.dao
            .select(&self.query, &self.order_by, self.limit, self.offset)
    }

    pub fn query_first(self) -> Result<Option<T>> {
        Ok(self.limit(1).query()?.into_iter().next())
    }
}

fn select_sql<T: Entity>() -> String {
    let columns: Vec<String> = std::iter::once(T::id_column())
        .chain(T::columns().iter().copied())
        .map(quote_ident)
        .collect();
    format!(
        "SELECT {} FROM {}",
        columns.join(", "),
        quote_ident(T::table_name())
    )
}

fn require_id<T: Entity>(entity: &T, operation: &'static str) -> Result<i64> {
    entity.id().ok_or(DaoError::MissingId {
        operation,
        table: T::table_name(),
    })
}

fn checked_values<T: Entity>(entity: &T) -> Result<Vec<Value>> {
    let values = entity.values();
    let expected = T::columns().len();
    if values.len() != expected {
        return Err(DaoError::ColumnCountMismatch {
            table: T::table_name(),
            expected,
            actual: values.len(),
        });
    }
    Ok(values)
}

fn id_exists_on<T: Entity>(conn: &Connection, id: i64) -> Result<bool> {
    let sql = format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = ?1)",
        quote_ident(T::table_name()),
        quote_ident(T::id_column())
    );
    let exists = conn.query_row(&sql, [id], |row| row.get(0))?;
    Ok(exists)
}

/// Returns the affected row count and, when `entity` had no id, the
/// generated rowid.
fn insert_row<T: Entity>(conn: &Connection, entity: &T) -> Result<(usize, Option<i64>)> {
    let mut values = checked_values(entity)?;
    let mut columns: Vec<&str> = T::columns().to_vec();
    if let Some(id) = entity.id() {
        columns.insert(0, T::id_column());
        values.insert(0, Value::Integer(id));
    }

    let table = quote_ident(T::table_name());
    let sql = if columns.is_empty() {
        format!("INSERT INTO {table} DEFAULT VALUES")
    } else {
        let names: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
        let marks = vec!["?"; columns.len()].join(", ");
        format!("INSERT INTO {table} ({}) VALUES ({marks})", names.join(", "))
    };
    let rows = conn.execute(&sql, params_from_iter(values.iter()))?;

    let generated = match entity.id() {
        Some(_) => None,
        None => Some(conn.last_insert_rowid()),
    };
    Ok((rows, generated))
}

fn update_row<T: Entity>(conn: &Connection, entity: &T) -> Result<usize> {
    let id = require_id(entity, "update")?;
    let mut values = checked_values(entity)?;
    // Nothing to assign; report whether the row is there.
    if values.is_empty() {
        return Ok(usize::from(id_exists_on::<T>(conn, id)?));
    }

    let assignments: Vec<String> = T::columns()
        .iter()
        .map(|c| format!("{} = ?", quote_ident(c)))
        .collect();
    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ?",
        quote_ident(T::table_name()),
        assignments.join(", "),
        quote_ident(T::id_column())
    );
    values.push(Value::Integer(id));
    let rows = conn.execute(&sql, params_from_iter(values.iter()))?;
    Ok(rows)
}
