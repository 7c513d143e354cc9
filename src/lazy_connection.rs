use std::fmt;

use crate::driver::{Cursor, PhysicalConnection};
use crate::engine::Engine;
use crate::error::DbError;

/// A worker's connection, opened on the first cursor request.
pub struct LazyConnection {
    engine: Engine,
    connection: Option<Box<dyn PhysicalConnection>>,
}

impl LazyConnection {
    #[must_use]
    pub fn new(engine: Engine) -> Self {
        Self {
            engine,
            connection: None,
        }
    }

    #[must_use]
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Whether a physical connection has been opened.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Return a cursor, opening the physical connection first if needed.
    ///
    /// # Errors
    /// Returns the engine's connect error.
    pub fn cursor(&mut self) -> Result<Cursor<'_>, DbError> {
        if self.connection.is_none() {
            let conn = self.engine.connect()?;
            tracing::info!(connection = conn.id(), "open connection");
            self.connection = Some(conn);
        }
        let conn = self.connection.as_mut().ok_or(DbError::NotConnected)?;
        Ok(Cursor::new(conn.as_mut()))
    }

    /// # Errors
    /// Returns `DbError::NotConnected` if no cursor was ever requested, or the driver's error.
    pub fn commit(&mut self) -> Result<(), DbError> {
        self.connection
            .as_mut()
            .ok_or(DbError::NotConnected)?
            .commit()
    }

    /// # Errors
    /// Returns `DbError::NotConnected` if no cursor was ever requested, or the driver's error.
    pub fn rollback(&mut self) -> Result<(), DbError> {
        self.connection
            .as_mut()
            .ok_or(DbError::NotConnected)?
            .rollback()
    }

    /// Close the physical connection if one is open. Safe to call repeatedly.
    ///
    /// # Errors
    /// Returns the driver's close error; the handle is cleared either way.
    pub fn cleanup(&mut self) -> Result<(), DbError> {
        match self.connection.take() {
            Some(conn) => {
                tracing::info!(connection = conn.id(), "close connection");
                conn.close()
            }
            None => Ok(()),
        }
    }
}

impl fmt::Debug for LazyConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyConnection")
            .field("connection", &self.connection.as_ref().map(|c| c.id()))
            .finish()
    }
}

impl Drop for LazyConnection {
    fn drop(&mut self) {
        if let Err(e) = self.cleanup() {
            tracing::warn!(error = %e, "closing connection on drop failed");
        }
    }
}
