use std::marker::PhantomData;

use crate::context::{ScopeTicket, with_current};
use crate::engine::Engine;
use crate::error::DbError;

/// Guarantees the calling thread has a connection until the guard is dropped.
///
/// Scopes nest freely. Only the outermost one attaches the lazy connection and
/// only it closes the connection again; inner scopes are no-ops on exit.
///
/// ```rust,no_run
/// # use sql_scope::prelude::*;
/// # fn demo() -> Result<(), DbError> {
/// let _conn = connection()?;
/// update("delete from sessions where expired = ?", &params![1])?;
/// let rows = select("select * from sessions", &[])?;
/// # let _ = rows;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
#[must_use = "the connection scope ends as soon as the guard is dropped"]
pub struct ConnectionScope {
    ticket: ScopeTicket,
    released: bool,
    // tied to the thread whose context it initialized
    _not_send: PhantomData<*const ()>,
}

impl ConnectionScope {
    /// Enter a connection scope on the calling thread.
    ///
    /// # Errors
    /// Returns `DbError::EngineMismatch` if the thread already holds a connection
    /// of another engine, or `DbError::Other` if the worker context cannot be reached.
    pub fn enter(engine: &Engine) -> Result<Self, DbError> {
        let ticket = with_current(|ctx| ctx.join(engine))?;
        Ok(Self {
            ticket,
            released: false,
            _not_send: PhantomData,
        })
    }

    /// Whether this scope attached the connection and will close it.
    #[must_use]
    pub fn owns_connection(&self) -> bool {
        self.ticket.owns_connection
    }

    /// End the scope now and report a failure to close the connection.
    ///
    /// # Errors
    /// Returns the driver's close error when this scope owns the connection, or
    /// `DbError::ScopeOrder` when it owns it and inner scopes are still open.
    pub fn close(mut self) -> Result<(), DbError> {
        self.release()
    }

    fn release(&mut self) -> Result<(), DbError> {
        if std::mem::replace(&mut self.released, true) {
            return Ok(());
        }
        let ticket = self.ticket;
        with_current(|ctx| ctx.leave(ticket))
    }
}

impl Drop for ConnectionScope {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            tracing::warn!(error = %e, "releasing connection failed");
        }
    }
}
