use std::marker::PhantomData;

use crate::context::{ScopeTicket, WorkerContext, with_current};
use crate::engine::Engine;
use crate::error::DbError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Commit,
    Rollback,
}

/// A nestable transaction on the calling thread's connection.
///
/// Nested scopes join the transaction opened by the outermost one. Only the
/// outermost scope touches the physical transaction: it commits when
/// [`commit`](Self::commit) is called and rolls back when it is rolled back or
/// dropped without committing (an early return through `?`, or a panic).
/// Inner scopes only adjust the nesting depth.
///
/// ```rust,no_run
/// # use sql_scope::prelude::*;
/// # fn demo() -> Result<(), DbError> {
/// let tx = transaction()?;
/// update("update account set balance = balance - ? where id = ?", &params![10, 1])?;
/// update("update account set balance = balance + ? where id = ?", &params![10, 2])?;
/// tx.commit()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
#[must_use = "dropping a transaction scope without commit rolls it back"]
pub struct TransactionScope {
    ticket: ScopeTicket,
    finished: bool,
    _not_send: PhantomData<*const ()>,
}

impl TransactionScope {
    /// Begin a transaction, or join the one already open on this thread.
    ///
    /// # Errors
    /// Returns `DbError::EngineMismatch` if the thread already holds a connection
    /// of another engine, or `DbError::Other` if the worker context cannot be reached.
    pub fn enter(engine: &Engine) -> Result<Self, DbError> {
        let ticket = with_current(|ctx| {
            let ticket = ctx.join(engine)?;
            let depth = ctx.enter_transaction();
            if depth == 1 {
                tracing::info!("begin transaction");
            } else {
                tracing::info!(depth, "join current transaction");
            }
            Ok(ticket)
        })?;
        Ok(Self {
            ticket,
            finished: false,
            _not_send: PhantomData,
        })
    }

    /// Whether this scope attached the connection and will close it.
    #[must_use]
    pub fn owns_connection(&self) -> bool {
        self.ticket.owns_connection
    }

    /// Leave the scope successfully. The outermost scope commits.
    ///
    /// If the physical commit fails a rollback is attempted and the commit
    /// error is returned.
    ///
    /// # Errors
    /// Returns the commit error, or the close error of an owned connection.
    /// Returns `DbError::ScopeOrder` if an enclosing scope already released the
    /// connection, or if this scope owns it and inner scopes are still open.
    pub fn commit(mut self) -> Result<(), DbError> {
        self.finish(Outcome::Commit)
    }

    /// Leave the scope unsuccessfully. The outermost scope rolls back.
    ///
    /// # Errors
    /// Returns the rollback error, or the close error of an owned connection.
    pub fn rollback(mut self) -> Result<(), DbError> {
        self.finish(Outcome::Rollback)
    }

    fn finish(&mut self, outcome: Outcome) -> Result<(), DbError> {
        if std::mem::replace(&mut self.finished, true) {
            return Ok(());
        }
        let ticket = self.ticket;
        with_current(|ctx| {
            if !ctx.is_current(ticket) {
                tracing::error!("transaction scope outlived the connection it joined");
                return Err(DbError::ScopeOrder(
                    "transaction scope outlived the connection it joined".into(),
                ));
            }
            let depth = ctx.exit_transaction();
            let result = if depth == 0 {
                match outcome {
                    Outcome::Commit => commit_outermost(ctx),
                    Outcome::Rollback => rollback_outermost(ctx),
                }
            } else if ticket.owns_connection {
                tracing::error!(depth, "transaction scope released before its inner scopes");
                rollback_outermost(ctx)
            } else {
                if outcome == Outcome::Rollback {
                    tracing::debug!(depth, "inner transaction scope left without commit");
                }
                Ok(())
            };
            // release runs whatever the transaction outcome was
            let released = ctx.leave(ticket);
            match (result, released) {
                (Err(e), Err(close_err)) => {
                    tracing::warn!(error = %close_err, "closing connection after failed transaction");
                    Err(e)
                }
                (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e),
                (Ok(()), Ok(())) => Ok(()),
            }
        })
    }
}

impl Drop for TransactionScope {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if std::thread::panicking() {
            tracing::warn!("transaction scope unwound by panic");
        }
        if let Err(e) = self.finish(Outcome::Rollback) {
            tracing::error!(error = %e, "rollback on scope exit failed");
        }
    }
}

fn commit_outermost(ctx: &mut WorkerContext) -> Result<(), DbError> {
    let conn = ctx.connection_mut()?;
    if !conn.is_connected() {
        tracing::debug!("no statement ran in transaction; nothing to commit");
        return Ok(());
    }
    tracing::info!("commit transaction");
    match conn.commit() {
        Ok(()) => {
            tracing::info!("commit ok");
            Ok(())
        }
        Err(e) => {
            tracing::warn!(error = %e, "commit failed, try rollback");
            match conn.rollback() {
                Ok(()) => tracing::info!("rollback ok"),
                Err(rollback_err) => {
                    tracing::error!(error = %rollback_err, "rollback after failed commit failed");
                }
            }
            Err(e)
        }
    }
}

fn rollback_outermost(ctx: &mut WorkerContext) -> Result<(), DbError> {
    let conn = ctx.connection_mut()?;
    if !conn.is_connected() {
        tracing::debug!("no statement ran in transaction; nothing to roll back");
        return Ok(());
    }
    tracing::warn!("rollback transaction");
    conn.rollback()?;
    tracing::info!("rollback ok");
    Ok(())
}
