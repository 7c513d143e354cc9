//! Per-thread connection state.
//!
//! Every worker thread has exactly one [`WorkerContext`]. It is never shared,
//! so nothing in this layer needs a lock; scopes and helpers reach it through
//! [`with_current`].

use std::cell::RefCell;

use crate::driver::Cursor;
use crate::engine::Engine;
use crate::error::DbError;
use crate::lazy_connection::LazyConnection;

thread_local! {
    static WORKER_CONTEXT: RefCell<WorkerContext> = RefCell::new(WorkerContext::default());
}

/// The calling thread's connection and transaction nesting depth.
#[derive(Debug, Default)]
pub struct WorkerContext {
    connection: Option<LazyConnection>,
    transactions: usize,
    // live scopes attached to the current connection
    scopes: usize,
    // bumped on every init so scopes of an earlier connection can be told apart
    generation: u64,
}

/// What a scope remembers about the context it entered.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ScopeTicket {
    pub(crate) owns_connection: bool,
    generation: u64,
}

impl WorkerContext {
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.connection.is_some()
    }

    /// Attach a fresh lazy connection and reset the transaction depth.
    ///
    /// # Errors
    /// Returns `DbError::ContextAlreadyInitialized` if a connection is already attached.
    pub fn init(&mut self, engine: &Engine) -> Result<(), DbError> {
        if self.is_initialized() {
            return Err(DbError::ContextAlreadyInitialized);
        }
        tracing::debug!("open lazy connection");
        self.connection = Some(LazyConnection::new(engine.clone()));
        self.transactions = 0;
        self.scopes = 0;
        self.generation += 1;
        Ok(())
    }

    /// Attach a scope, initializing the context first when nothing is attached.
    pub(crate) fn join(&mut self, engine: &Engine) -> Result<ScopeTicket, DbError> {
        let owns_connection = if let Some(conn) = &self.connection {
            if !conn.engine().same_as(engine) {
                return Err(DbError::EngineMismatch);
            }
            false
        } else {
            self.init(engine)?;
            true
        };
        self.scopes += 1;
        Ok(ScopeTicket {
            owns_connection,
            generation: self.generation,
        })
    }

    /// Whether the connection `ticket` was issued for is still attached.
    pub(crate) fn is_current(&self, ticket: ScopeTicket) -> bool {
        self.is_initialized() && ticket.generation == self.generation
    }

    /// Detach a scope; the owning scope closes the connection.
    ///
    /// An owning scope leaving while inner scopes are still open closes the
    /// connection anyway and reports `DbError::ScopeOrder`.
    pub(crate) fn leave(&mut self, ticket: ScopeTicket) -> Result<(), DbError> {
        if !self.is_current(ticket) {
            return Ok(());
        }
        self.scopes = self.scopes.saturating_sub(1);
        if !ticket.owns_connection {
            return Ok(());
        }
        let open = std::mem::take(&mut self.scopes);
        self.transactions = 0;
        let closed = self.cleanup();
        if open > 0 {
            tracing::error!(open, "connection released while inner scopes are still open");
            if let Err(e) = closed {
                tracing::warn!(error = %e, "closing connection failed");
            }
            return Err(DbError::ScopeOrder(format!(
                "outermost scope left while {open} inner scope(s) were still open"
            )));
        }
        closed
    }

    /// Close and detach the lazy connection.
    ///
    /// # Errors
    /// Returns `DbError::ContextNotInitialized` if nothing is attached, or the close error.
    /// The connection is detached even when closing fails.
    pub fn cleanup(&mut self) -> Result<(), DbError> {
        let mut connection = self
            .connection
            .take()
            .ok_or(DbError::ContextNotInitialized)?;
        connection.cleanup()
    }

    /// # Errors
    /// Returns `DbError::ContextNotInitialized` before [`init`](Self::init), or the connect error.
    pub fn cursor(&mut self) -> Result<Cursor<'_>, DbError> {
        self.connection_mut()?.cursor()
    }

    /// # Errors
    /// Returns `DbError::ContextNotInitialized` before [`init`](Self::init).
    pub fn connection_mut(&mut self) -> Result<&mut LazyConnection, DbError> {
        self.connection
            .as_mut()
            .ok_or(DbError::ContextNotInitialized)
    }

    /// Number of transaction scopes currently open on this thread.
    #[must_use]
    pub fn transaction_depth(&self) -> usize {
        self.transactions
    }

    pub(crate) fn enter_transaction(&mut self) -> usize {
        self.transactions += 1;
        self.transactions
    }

    pub(crate) fn exit_transaction(&mut self) -> usize {
        self.transactions = self.transactions.saturating_sub(1);
        self.transactions
    }
}

/// Run `f` against the calling thread's context.
///
/// # Errors
/// Returns `DbError::Other` if the context is already borrowed further up the
/// stack or the thread is shutting down, otherwise whatever `f` returns.
pub fn with_current<R>(
    f: impl FnOnce(&mut WorkerContext) -> Result<R, DbError>,
) -> Result<R, DbError> {
    WORKER_CONTEXT
        .try_with(|ctx| {
            let mut ctx = ctx.try_borrow_mut().map_err(|_| {
                DbError::Other("worker context is already in use on this thread".into())
            })?;
            f(&mut ctx)
        })
        .map_err(|_| DbError::Other("worker context is no longer available".into()))?
}

/// Whether the calling thread currently holds a lazy connection.
#[must_use]
pub fn is_initialized() -> bool {
    with_current(|ctx| Ok(ctx.is_initialized())).unwrap_or(false)
}

/// Transaction nesting depth of the calling thread.
#[must_use]
pub fn transaction_depth() -> usize {
    with_current(|ctx| Ok(ctx.transaction_depth())).unwrap_or(0)
}
