use std::collections::HashMap;

use tracing::error;

use crate::dao::{CreateOrUpdateStatus, Dao};
use crate::entity::Entity;
use crate::error::{DaoError, Result};
use crate::helper::DatabaseHelper;
use crate::sqlite::Value;

/// Convenience CRUD over the DAO of a single entity type.
///
/// The DAO is requested once, in [`DaoUtils::new`]. If that fails the wrapper
/// stays usable as a value but every operation returns
/// [`DaoError::DaoUnavailable`]; the handle is never retried or replaced.
#[derive(Debug)]
pub struct DaoUtils<T: Entity> {
    helper: DatabaseHelper,
    dao: Option<Dao<T>>,
}

impl<T: Entity> DaoUtils<T> {
    pub fn new(helper: &DatabaseHelper) -> Self {
        let dao = match helper.get_dao::<T>() {
            Ok(dao) => Some(dao),
            Err(err) => {
                error!(table = T::table_name(), error = %err, "failed to obtain dao");
                None
            }
        };
        Self {
            helper: helper.clone(),
            dao,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.dao.is_some()
    }

    fn dao(&self) -> Result<&Dao<T>> {
        self.dao.as_ref().ok_or(DaoError::DaoUnavailable {
            table: T::table_name(),
        })
    }

    // -- insert ---------------------------------------------------------

    /// Create `object`, or update it when its id already exists.
    pub fn insert(&self, object: &mut T) -> Result<CreateOrUpdateStatus> {
        self.dao()?.create_or_update(object)
    }

    /// Create every object; fails if any of them already exists.
    pub fn insert_batch(&self, objects: &mut [T]) -> Result<usize> {
        self.dao()?.create_all(objects)
    }

    // -- query ----------------------------------------------------------

    pub fn get_all(&self) -> Result<Vec<T>> {
        self.dao()?.query_for_all()
    }

    pub fn get_by_id(&self, id: i64) -> Result<Option<T>> {
        self.dao()?.query_for_id(id)
    }

    /// Rows matching every `field = value` pair.
    pub fn get_by_equal(&self, clauses: &HashMap<String, Value>) -> Result<Vec<T>> {
        self.dao()?.query_for_field_values(clauses)
    }

    pub fn get_by_field(&self, field: &str, value: impl Into<Value>) -> Result<Vec<T>> {
        self.dao()?.query_builder().where_eq(field, value).query()
    }

    // -- update / delete ------------------------------------------------

    pub fn update(&self, object: &T) -> Result<usize> {
        self.dao()?.update(object)
    }

    pub fn delete(&self, object: &T) -> Result<usize> {
        self.dao()?.delete(object)
    }

    pub fn delete_batch(&self, objects: &[T]) -> Result<usize> {
        self.dao()?.delete_all(objects)
    }

    /// Delete all rows of `table_name` and reset its autoincrement counter.
    ///
    /// The name must be an existing table; it is never spliced into SQL
    /// unquoted.
    pub fn clean_table(&self, table_name: &str) -> Result<usize> {
        self.dao()?;
        self.helper.clear_table(table_name)
    }

    /// The underlying DAO, for operations the wrapper does not cover.
    pub fn get_dao(&self) -> Result<&Dao<T>> {
        self.dao()
    }
}
