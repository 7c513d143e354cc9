use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),

    #[error("Engine is already initialized")]
    EngineAlreadyInitialized,

    #[error("Engine is not initialized; call create_engine first")]
    EngineNotInitialized,

    #[error("Worker context is not initialized; open a connection or transaction scope first")]
    ContextNotInitialized,

    #[error("Worker context is already initialized")]
    ContextAlreadyInitialized,

    #[error("Worker context is bound to a different engine")]
    EngineMismatch,

    #[error("Scope released out of order: {0}")]
    ScopeOrder(String),

    #[error("Lazy connection was never opened")]
    NotConnected,

    #[error("Expected exactly one column, got {0}")]
    MultiColumnError(usize),

    #[error("Expected exactly one row, got {0}")]
    RowCountError(usize),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Parameter error: {0}")]
    ParameterError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    #[error("Other database error: {0}")]
    Other(String),
}
