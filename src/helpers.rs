//! Statement helpers.
//!
//! Each helper opens a [`ConnectionScope`](crate::ConnectionScope) for itself,
//! so it reuses the caller's connection when one is open and otherwise opens and
//! closes one around the single statement. Statements use the portable `?` token.

use std::borrow::Cow;

use crate::context::with_current;
use crate::engine::{Engine, engine};
use crate::error::DbError;
use crate::query_builder::build_insert;
use crate::results::{ResultSet, Row};
use crate::translation::translate_placeholders;
use crate::types::RowValues;

impl Engine {
    fn prepare<'s>(&self, sql: &'s str, args: &[RowValues]) -> Result<Cow<'s, str>, DbError> {
        let translated = translate_placeholders(sql, self.placeholder_style())?;
        if translated.placeholders != args.len() {
            return Err(DbError::ParameterError(format!(
                "statement has {} placeholders but {} arguments were given",
                translated.placeholders,
                args.len()
            )));
        }
        tracing::debug!(sql = %translated.sql, ?args, "SQL");
        Ok(translated.sql)
    }

    fn query_all(&self, sql: &str, args: &[RowValues]) -> Result<ResultSet, DbError> {
        let sql = self.prepare(sql, args)?;
        let scope = self.connection()?;
        let result_set = with_current(|ctx| {
            let result_set = ctx.cursor()?.query(&sql, args)?;
            if ctx.transaction_depth() == 0 {
                // a read outside any transaction must not keep its snapshot open
                ctx.connection_mut()?.commit()?;
            }
            Ok(result_set)
        })?;
        scope.close()?;
        Ok(result_set)
    }

    /// Run a query and return every row; no match yields an empty vector.
    ///
    /// Outside any transaction scope the read is ended right away, so later
    /// reads see other workers' commits and no lock is held between statements.
    ///
    /// # Errors
    /// Returns `DbError::ParameterError` when placeholders and arguments disagree,
    /// or the driver's error.
    pub fn select(&self, sql: &str, args: &[RowValues]) -> Result<Vec<Row>, DbError> {
        Ok(self.query_all(sql, args)?.into_rows())
    }

    /// Run a query and return its first row, or `None` when nothing matched.
    ///
    /// # Errors
    /// Same as [`Engine::select`].
    pub fn select_one(&self, sql: &str, args: &[RowValues]) -> Result<Option<Row>, DbError> {
        Ok(self.query_all(sql, args)?.into_rows().into_iter().next())
    }

    /// Run a query that must produce exactly one row with exactly one column.
    ///
    /// # Errors
    /// Returns `DbError::MultiColumnError` unless the result has one column,
    /// `DbError::RowCountError` unless it has one row, or the errors of [`Engine::select`].
    pub fn select_scalar(&self, sql: &str, args: &[RowValues]) -> Result<RowValues, DbError> {
        let result_set = self.query_all(sql, args)?;
        let columns = result_set.column_names().len();
        if columns != 1 {
            return Err(DbError::MultiColumnError(columns));
        }
        if result_set.len() != 1 {
            return Err(DbError::RowCountError(result_set.len()));
        }
        result_set
            .into_rows()
            .into_iter()
            .next()
            .and_then(|row| row.into_values().into_iter().next())
            .ok_or(DbError::RowCountError(0))
    }

    /// [`Engine::select_scalar`] for integer results such as `count(*)`.
    ///
    /// # Errors
    /// Returns `DbError::TypeMismatch` if the value is not an integer, or the
    /// errors of [`Engine::select_scalar`].
    pub fn select_int(&self, sql: &str, args: &[RowValues]) -> Result<i64, DbError> {
        match self.select_scalar(sql, args)? {
            RowValues::Int(value) => Ok(value),
            RowValues::Bool(value) => Ok(i64::from(value)),
            other => Err(DbError::TypeMismatch(format!(
                "expected an integer, got {}",
                other.kind()
            ))),
        }
    }

    /// Run a statement that changes data and return the affected row count.
    ///
    /// Outside any transaction scope the statement is committed at once; inside
    /// one the commit is left to the outermost scope.
    ///
    /// # Errors
    /// Same as [`Engine::select`], plus the auto-commit error.
    pub fn update(&self, sql: &str, args: &[RowValues]) -> Result<usize, DbError> {
        let sql = self.prepare(sql, args)?;
        let scope = self.connection()?;
        let affected = with_current(|ctx| {
            let affected = ctx.cursor()?.execute(&sql, args)?;
            if ctx.transaction_depth() == 0 {
                tracing::debug!("auto commit");
                ctx.connection_mut()?.commit()?;
            }
            Ok(affected)
        })?;
        scope.close()?;
        Ok(affected)
    }

    /// Insert one row built from ordered column/value pairs.
    ///
    /// # Errors
    /// Returns the errors of [`build_insert`] and [`Engine::update`].
    pub fn insert(&self, table: &str, column_values: &[(&str, RowValues)]) -> Result<usize, DbError> {
        let (sql, args) = build_insert(table, column_values, self.placeholder_style())?;
        self.update(&sql, &args)
    }
}

/// [`Engine::select`] on the process-wide engine.
///
/// # Errors
/// Returns `DbError::EngineNotInitialized` before `create_engine`, or the errors of [`Engine::select`].
pub fn select(sql: &str, args: &[RowValues]) -> Result<Vec<Row>, DbError> {
    engine()?.select(sql, args)
}

/// [`Engine::select_one`] on the process-wide engine.
///
/// # Errors
/// Returns `DbError::EngineNotInitialized` before `create_engine`, or the errors of [`Engine::select_one`].
pub fn select_one(sql: &str, args: &[RowValues]) -> Result<Option<Row>, DbError> {
    engine()?.select_one(sql, args)
}

/// [`Engine::select_scalar`] on the process-wide engine.
///
/// # Errors
/// Returns `DbError::EngineNotInitialized` before `create_engine`, or the errors of [`Engine::select_scalar`].
pub fn select_scalar(sql: &str, args: &[RowValues]) -> Result<RowValues, DbError> {
    engine()?.select_scalar(sql, args)
}

/// [`Engine::select_int`] on the process-wide engine.
///
/// # Errors
/// Returns `DbError::EngineNotInitialized` before `create_engine`, or the errors of [`Engine::select_int`].
pub fn select_int(sql: &str, args: &[RowValues]) -> Result<i64, DbError> {
    engine()?.select_int(sql, args)
}

/// [`Engine::update`] on the process-wide engine.
///
/// # Errors
/// Returns `DbError::EngineNotInitialized` before `create_engine`, or the errors of [`Engine::update`].
pub fn update(sql: &str, args: &[RowValues]) -> Result<usize, DbError> {
    engine()?.update(sql, args)
}

/// [`Engine::insert`] on the process-wide engine.
///
/// # Errors
/// Returns `DbError::EngineNotInitialized` before `create_engine`, or the errors of [`Engine::insert`].
pub fn insert(table: &str, column_values: &[(&str, RowValues)]) -> Result<usize, DbError> {
    engine()?.insert(table, column_values)
}
