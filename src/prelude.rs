//! Convenient imports for common functionality.

pub use crate::config::{EngineConfig, EngineConfigBuilder};
pub use crate::driver::{Connector, Cursor, PhysicalConnection};
#[cfg(feature = "sqlite")]
pub use crate::engine::create_engine;
pub use crate::engine::{Engine, engine, init_engine};
pub use crate::error::DbError;
pub use crate::helpers::{insert, select, select_int, select_one, select_scalar, update};
pub use crate::params;
pub use crate::query_builder::build_insert;
pub use crate::results::{ResultSet, Row};
pub use crate::scope::{
    ConnectionScope, TransactionScope, connection, transaction, with_connection,
    with_transaction,
};
pub use crate::translation::{PlaceholderStyle, translate_placeholders};
pub use crate::types::RowValues;
