//! Typed generic DAO utilities over embedded SQLite.
//!
//! # Intention
//!
//! - Give each entity type a small CRUD surface (`DaoUtils<T>`) over a typed
//!   DAO, so callers doing simple persistence skip the SQL boilerplate.
//! - Keep SQLite-specific logic, types and error handling in one place.
//!
//! # Architectural Boundaries
//!
//! - Only SQLite/database code belongs here.
//! - Entities describe their own row mapping through [`Entity`]; no business
//!   logic lives in this crate.
//! - Every statement binds its values; identifiers are quoted.

pub mod dao;
pub mod dao_utils;
pub mod entity;
pub mod error;
pub mod helper;
pub mod sqlite;

pub use dao::{CreateOrUpdateStatus, Dao, QueryBuilder};
pub use dao_utils::DaoUtils;
pub use entity::Entity;
pub use error::{DaoError, Result};
pub use helper::DatabaseHelper;
pub use sqlite::{
    quote_ident, ColumnConstraint, ColumnDefinition, DataType, DefaultValue, ForeignKey,
    ForeignKeyAction, IndexDefinition, Params, Query, QueryOperator, Schema, SqlQuery,
    SqliteConfig, TableDefinition, Value,
};
