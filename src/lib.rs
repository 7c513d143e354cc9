//! Thread-local lazy connections with nestable connection and transaction scopes.
//!
//! One [`Engine`] per process knows how to open connections. Each worker thread
//! gets its own lazily opened connection the first time a statement runs inside
//! a scope, and arbitrarily deep call chains share that one connection and one
//! transaction:
//!
//! ```rust,no_run
//! use sql_scope::prelude::*;
//!
//! fn add_user(id: i64, name: &str) -> Result<usize, DbError> {
//!     // joins the caller's transaction when there is one
//!     with_transaction(|| insert("user", &[("id", id.into()), ("name", name.into())]))
//! }
//!
//! fn main() -> Result<(), DbError> {
//!     EngineConfig::builder("root", "password", "blog.db").build()?;
//!     update("create table if not exists user (id int primary key, name text)", &[])?;
//!
//!     let tx = transaction()?;
//!     add_user(1, "a")?;
//!     add_user(2, "b")?;
//!     tx.commit()?;
//!
//!     let row = select_one("select name from user where id = ?", &params![1])?;
//!     assert_eq!(
//!         row.and_then(|r| r.get("name").cloned()),
//!         Some(RowValues::Text("a".into()))
//!     );
//!     Ok(())
//! }
//! ```
//!
//! Statements use the portable `?` placeholder, rewritten to the driver's marker
//! before execution.

pub mod config;
pub mod context;
pub mod driver;
pub mod engine;
pub mod error;
pub mod helpers;
pub mod lazy_connection;
pub mod prelude;
pub mod query_builder;
pub mod results;
pub mod scope;
pub mod translation;
pub mod types;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::{EngineConfig, EngineConfigBuilder};
pub use context::WorkerContext;
pub use driver::{Connector, Cursor, PhysicalConnection};
#[cfg(feature = "sqlite")]
pub use engine::create_engine;
pub use engine::{Engine, engine, init_engine};
pub use error::DbError;
pub use helpers::{insert, select, select_int, select_one, select_scalar, update};
pub use lazy_connection::LazyConnection;
pub use results::{ResultSet, Row};
pub use scope::{
    ConnectionScope, TransactionScope, connection, transaction, with_connection,
    with_transaction,
};
pub use translation::{PlaceholderStyle, Translated, translate_placeholders};
pub use types::RowValues;
