use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use rusqlite::params_from_iter;

use crate::driver::PhysicalConnection;
use crate::error::DbError;
use crate::results::ResultSet;
use crate::types::RowValues;

use super::params::Params;
use super::query::build_result_set;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// A physical `SQLite` connection.
///
/// With `autocommit` off an implicit `BEGIN` is issued before the first
/// statement after open, commit, or rollback, so work stays pending until
/// [`commit`](PhysicalConnection::commit) like on a client/server database.
pub struct SqliteConnection {
    id: u64,
    conn: rusqlite::Connection,
    autocommit: bool,
}

impl SqliteConnection {
    #[must_use]
    pub fn new(conn: rusqlite::Connection, autocommit: bool) -> Self {
        Self {
            id: NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            conn,
            autocommit,
        }
    }

    /// Whether a transaction is currently open on the connection.
    #[must_use]
    pub fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }

    fn ensure_transaction(&mut self) -> Result<(), DbError> {
        if !self.autocommit && self.conn.is_autocommit() {
            self.conn.execute_batch("BEGIN")?;
        }
        Ok(())
    }
}

impl PhysicalConnection for SqliteConnection {
    fn id(&self) -> u64 {
        self.id
    }

    fn execute(&mut self, sql: &str, params: &[RowValues]) -> Result<usize, DbError> {
        self.ensure_transaction()?;
        let params = Params::convert(params);
        let mut stmt = self.conn.prepare_cached(sql)?;
        Ok(stmt.execute(params_from_iter(params.as_values().iter()))?)
    }

    fn query(&mut self, sql: &str, params: &[RowValues]) -> Result<ResultSet, DbError> {
        self.ensure_transaction()?;
        let params = Params::convert(params);
        let mut stmt = self.conn.prepare_cached(sql)?;
        build_result_set(&mut stmt, params.as_values())
    }

    fn commit(&mut self) -> Result<(), DbError> {
        if self.in_transaction() {
            self.conn.execute_batch("COMMIT")?;
        }
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), DbError> {
        if self.in_transaction() {
            self.conn.execute_batch("ROLLBACK")?;
        }
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<(), DbError> {
        let SqliteConnection { conn, .. } = *self;
        conn.close().map_err(|(_, e)| DbError::SqliteError(e))
    }
}

impl fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteConnection")
            .field("id", &self.id)
            .field("autocommit", &self.autocommit)
            .field("in_transaction", &self.in_transaction())
            .finish()
    }
}
