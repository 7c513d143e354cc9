use std::collections::HashMap;
use std::sync::Arc;

use crate::types::RowValues;

/// A single row from a query result: an ordered mapping from column name to value.
///
/// Column names are shared by every row of the same result set. Lookups by name
/// go through a cached index; iteration follows the column order of the statement.
#[derive(Debug, Clone)]
pub struct Row {
    column_names: Arc<Vec<String>>,
    values: Vec<RowValues>,
    column_index_cache: Arc<HashMap<String, usize>>,
}

impl Row {
    /// Create a row, building a fresh name index.
    ///
    /// Result sets use [`Row::with_index`] so all rows share one index.
    #[must_use]
    pub fn new(column_names: Arc<Vec<String>>, values: Vec<RowValues>) -> Self {
        let cache = Arc::new(build_index(&column_names));
        Self::with_index(column_names, values, cache)
    }

    pub(crate) fn with_index(
        column_names: Arc<Vec<String>>,
        values: Vec<RowValues>,
        column_index_cache: Arc<HashMap<String, usize>>,
    ) -> Self {
        Self {
            column_names,
            values,
            column_index_cache,
        }
    }

    /// Get the index of a column by name
    #[must_use]
    pub fn get_column_index(&self, column_name: &str) -> Option<usize> {
        if let Some(&idx) = self.column_index_cache.get(column_name) {
            return Some(idx);
        }
        self.column_names.iter().position(|col| col == column_name)
    }

    /// Get a value from the row by column name
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&RowValues> {
        self.get_column_index(column_name)
            .and_then(|idx| self.values.get(idx))
    }

    /// Get a value from the row by column index
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&RowValues> {
        self.values.get(index)
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.column_names
    }

    #[must_use]
    pub fn values(&self) -> &[RowValues] {
        &self.values
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate `(column, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RowValues)> {
        self.column_names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    /// Consume the row into owned `(column, value)` pairs, preserving column order.
    #[must_use]
    pub fn into_map(self) -> Vec<(String, RowValues)> {
        self.column_names
            .iter()
            .cloned()
            .zip(self.values)
            .collect()
    }

    pub(crate) fn into_values(self) -> Vec<RowValues> {
        self.values
    }
}

impl PartialEq for Row {
    fn eq(&self, other: &Self) -> bool {
        self.column_names == other.column_names && self.values == other.values
    }
}

pub(crate) fn build_index(column_names: &[String]) -> HashMap<String, usize> {
    let mut index = HashMap::with_capacity(column_names.len());
    for (i, name) in column_names.iter().enumerate() {
        // first occurrence wins for duplicate column names
        index.entry(name.clone()).or_insert(i);
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Row {
        Row::new(
            Arc::new(vec!["id".into(), "name".into(), "id".into()]),
            vec![
                RowValues::Int(1),
                RowValues::Text("a".into()),
                RowValues::Int(2),
            ],
        )
    }

    #[test]
    fn duplicate_columns_resolve_to_first() {
        let row = sample();
        assert_eq!(row.get("id"), Some(&RowValues::Int(1)));
        assert_eq!(row.get_by_index(2), Some(&RowValues::Int(2)));
        assert_eq!(row.get("missing"), None);
    }

    #[test]
    fn iteration_keeps_column_order() {
        let row = sample();
        let names: Vec<&str> = row.iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["id", "name", "id"]);
        let pairs = row.into_map();
        assert_eq!(pairs[1], ("name".to_string(), RowValues::Text("a".into())));
    }
}
