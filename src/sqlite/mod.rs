//! `SQLite` backend built on rusqlite.

mod config;
mod connection;
mod params;
mod query;

pub use config::SqliteConnector;
pub use connection::SqliteConnection;
pub use params::{Params, row_value_to_sqlite_value};
pub use query::{build_result_set, sqlite_extract_value};
