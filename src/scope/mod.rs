//! Nestable connection and transaction scopes.

mod connection;
mod transaction;

pub use connection::ConnectionScope;
pub use transaction::TransactionScope;

use crate::engine::{Engine, engine};
use crate::error::DbError;

impl Engine {
    /// Enter a [`ConnectionScope`] backed by this engine.
    ///
    /// # Errors
    /// See [`ConnectionScope::enter`].
    pub fn connection(&self) -> Result<ConnectionScope, DbError> {
        ConnectionScope::enter(self)
    }

    /// Enter a [`TransactionScope`] backed by this engine.
    ///
    /// # Errors
    /// See [`TransactionScope::enter`].
    pub fn transaction(&self) -> Result<TransactionScope, DbError> {
        TransactionScope::enter(self)
    }

    /// Run `f` with a connection available to every helper it calls.
    ///
    /// # Errors
    /// Returns the scope error or whatever `f` returns.
    pub fn with_connection<T, E>(&self, f: impl FnOnce() -> Result<T, E>) -> Result<T, E>
    where
        E: From<DbError>,
    {
        let scope = self.connection()?;
        let value = f()?;
        scope.close()?;
        Ok(value)
    }

    /// Run `f` inside a transaction: `Ok` commits, `Err` rolls back.
    ///
    /// When `f` fails and the rollback fails too, the rollback error replaces
    /// `f`'s error.
    ///
    /// # Errors
    /// Returns `f`'s error, the rollback error, or the commit error.
    pub fn with_transaction<T, E>(&self, f: impl FnOnce() -> Result<T, E>) -> Result<T, E>
    where
        E: From<DbError>,
    {
        let scope = self.transaction()?;
        match f() {
            Ok(value) => {
                scope.commit()?;
                Ok(value)
            }
            Err(e) => {
                match scope.rollback() {
                    Ok(()) => Err(e),
                    Err(rollback_err) => {
                        tracing::error!(error = %rollback_err, "rollback after failed closure failed");
                        Err(rollback_err.into())
                    }
                }
            }
        }
    }
}

/// Enter a [`ConnectionScope`] on the process-wide engine.
///
/// # Errors
/// Returns `DbError::EngineNotInitialized` before `create_engine`.
pub fn connection() -> Result<ConnectionScope, DbError> {
    engine()?.connection()
}

/// Enter a [`TransactionScope`] on the process-wide engine.
///
/// # Errors
/// Returns `DbError::EngineNotInitialized` before `create_engine`.
pub fn transaction() -> Result<TransactionScope, DbError> {
    engine()?.transaction()
}

/// [`Engine::with_connection`] on the process-wide engine.
///
/// # Errors
/// Returns `DbError::EngineNotInitialized` before `create_engine`, or `f`'s error.
pub fn with_connection<T, E>(f: impl FnOnce() -> Result<T, E>) -> Result<T, E>
where
    E: From<DbError>,
{
    engine()?.with_connection(f)
}

/// [`Engine::with_transaction`] on the process-wide engine.
///
/// # Errors
/// Returns `DbError::EngineNotInitialized` before `create_engine`, or `f`'s error.
pub fn with_transaction<T, E>(f: impl FnOnce() -> Result<T, E>) -> Result<T, E>
where
    E: From<DbError>,
{
    engine()?.with_transaction(f)
}
