use std::collections::HashMap;
use std::sync::Arc;

use super::row::{Row, build_index};
use crate::types::RowValues;

/// A materialized query result.
///
/// Every row is read before the statement finishes, so the connection is free
/// for the next statement as soon as the result set is returned.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    /// The rows returned by the query
    pub results: Vec<Row>,
    /// The number of rows affected (for DML statements)
    pub rows_affected: usize,
    column_names: Arc<Vec<String>>,
    column_index: Arc<HashMap<String, usize>>,
}

impl ResultSet {
    /// Create an empty result set for the given columns.
    #[must_use]
    pub fn with_columns(column_names: Vec<String>) -> ResultSet {
        let column_index = Arc::new(build_index(&column_names));
        ResultSet {
            results: Vec::new(),
            rows_affected: 0,
            column_names: Arc::new(column_names),
            column_index,
        }
    }

    /// Get the column names for this result set
    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Add a row to the result set
    ///
    /// # Errors
    ///
    /// Returns `DbError::ExecutionError` if the value count does not match the column count.
    pub fn add_row_values(
        &mut self,
        row_values: Vec<RowValues>,
    ) -> Result<(), crate::error::DbError> {
        if row_values.len() != self.column_names.len() {
            return Err(crate::error::DbError::ExecutionError(format!(
                "row has {} values for {} columns",
                row_values.len(),
                self.column_names.len()
            )));
        }
        self.results.push(Row::with_index(
            Arc::clone(&self.column_names),
            row_values,
            Arc::clone(&self.column_index),
        ));
        self.rows_affected += 1;
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Consume the result set into its rows.
    #[must_use]
    pub fn into_rows(self) -> Vec<Row> {
        self.results
    }
}
