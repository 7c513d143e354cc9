//! The seam between the scoping layer and a concrete database driver.
//!
//! An [`Engine`](crate::Engine) holds one [`Connector`]; every worker thread asks it
//! for its own [`PhysicalConnection`] the first time a statement runs.

use std::fmt;
use std::time::{Duration, Instant};

use crate::error::DbError;
use crate::results::ResultSet;
use crate::translation::PlaceholderStyle;
use crate::types::RowValues;

/// Statements slower than this are logged at WARN.
pub const SLOW_STATEMENT_THRESHOLD: Duration = Duration::from_millis(100);

/// Factory for physical connections. Shared read-only by every worker.
pub trait Connector: Send + Sync + fmt::Debug {
    /// Open a new physical connection.
    ///
    /// # Errors
    /// Returns the driver's error when the connection cannot be established.
    fn connect(&self) -> Result<Box<dyn PhysicalConnection>, DbError>;

    /// The marker the driver expects in place of the portable `?` token.
    fn placeholder_style(&self) -> PlaceholderStyle;
}

/// One open connection owned by exactly one worker.
///
/// Implementations must not auto-commit: statements stay pending until
/// [`commit`](PhysicalConnection::commit) unless the connection was configured otherwise.
pub trait PhysicalConnection {
    /// Stable identifier used in log lines.
    fn id(&self) -> u64;

    /// Run a statement that does not return rows; yields the affected row count.
    ///
    /// # Errors
    /// Returns the driver's error unchanged.
    fn execute(&mut self, sql: &str, params: &[RowValues]) -> Result<usize, DbError>;

    /// Run a query and read every row before returning.
    ///
    /// # Errors
    /// Returns the driver's error unchanged.
    fn query(&mut self, sql: &str, params: &[RowValues]) -> Result<ResultSet, DbError>;

    /// # Errors
    /// Returns the driver's error unchanged.
    fn commit(&mut self) -> Result<(), DbError>;

    /// # Errors
    /// Returns the driver's error unchanged.
    fn rollback(&mut self) -> Result<(), DbError>;

    /// Close the connection, discarding any uncommitted work.
    ///
    /// # Errors
    /// Returns the driver's error unchanged.
    fn close(self: Box<Self>) -> Result<(), DbError>;
}

/// A short-lived statement handle bound to a materialized physical connection.
pub struct Cursor<'c> {
    conn: &'c mut dyn PhysicalConnection,
}

impl<'c> Cursor<'c> {
    pub(crate) fn new(conn: &'c mut dyn PhysicalConnection) -> Self {
        Self { conn }
    }

    #[must_use]
    pub fn connection_id(&self) -> u64 {
        self.conn.id()
    }

    /// Execute a statement written in the driver's native placeholder style.
    ///
    /// # Errors
    /// Returns the driver's error unchanged.
    pub fn execute(&mut self, sql: &str, params: &[RowValues]) -> Result<usize, DbError> {
        let start = Instant::now();
        let result = self.conn.execute(sql, params);
        profile(start, sql);
        result
    }

    /// Run a query written in the driver's native placeholder style.
    ///
    /// # Errors
    /// Returns the driver's error unchanged.
    pub fn query(&mut self, sql: &str, params: &[RowValues]) -> Result<ResultSet, DbError> {
        let start = Instant::now();
        let result = self.conn.query(sql, params);
        profile(start, sql);
        result
    }
}

impl fmt::Debug for Cursor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("connection_id", &self.conn.id())
            .finish()
    }
}

fn profile(start: Instant, sql: &str) {
    let elapsed = start.elapsed();
    if elapsed > SLOW_STATEMENT_THRESHOLD {
        tracing::warn!(?elapsed, sql, "[PROFILING] [DB] slow statement");
    } else {
        tracing::debug!(?elapsed, sql, "[PROFILING] [DB]");
    }
}
