use crate::error::DbError;
use crate::translation::PlaceholderStyle;
use crate::types::RowValues;

/// Quote an identifier for the dialect implied by `style`.
///
/// MySQL-style drivers (`Format`) use backticks, everything else ANSI double quotes.
/// Embedded quote characters are doubled.
#[must_use]
pub fn quote_identifier(name: &str, style: PlaceholderStyle) -> String {
    let quote = match style {
        PlaceholderStyle::Format => '`',
        PlaceholderStyle::Question | PlaceholderStyle::Sqlite | PlaceholderStyle::Postgres => '"',
    };
    let mut quoted = String::with_capacity(name.len() + 2);
    quoted.push(quote);
    for ch in name.chars() {
        if ch == quote {
            quoted.push(quote);
        }
        quoted.push(ch);
    }
    quoted.push(quote);
    quoted
}

/// Build `insert into <table> (<cols>) values (?, ...)` from ordered column/value pairs.
///
/// The statement uses portable `?` tokens; the returned arguments are in column order.
///
/// ```rust
/// use sql_scope::prelude::*;
///
/// let (sql, args) = build_insert(
///     "user",
///     &[("id", 1.into()), ("name", "a".into())],
///     PlaceholderStyle::Sqlite,
/// )?;
/// assert_eq!(sql, r#"insert into "user" ("id","name") values (?,?)"#);
/// assert_eq!(args, params![1, "a"]);
/// # Ok::<(), DbError>(())
/// ```
///
/// # Errors
/// Returns `DbError::ParameterError` for an empty table name, an empty column
/// list, an empty column name, or a repeated column.
pub fn build_insert(
    table: &str,
    column_values: &[(&str, RowValues)],
    style: PlaceholderStyle,
) -> Result<(String, Vec<RowValues>), DbError> {
    if table.is_empty() {
        return Err(DbError::ParameterError("insert: empty table name".into()));
    }
    if column_values.is_empty() {
        return Err(DbError::ParameterError(format!(
            "insert into {table}: no columns given"
        )));
    }

    let mut columns = Vec::with_capacity(column_values.len());
    let mut args = Vec::with_capacity(column_values.len());
    for (column, value) in column_values {
        if column.is_empty() {
            return Err(DbError::ParameterError(format!(
                "insert into {table}: empty column name"
            )));
        }
        if column_values
            .iter()
            .filter(|(other, _)| other == column)
            .count()
            > 1
        {
            return Err(DbError::ParameterError(format!(
                "insert into {table}: column {column} given twice"
            )));
        }
        columns.push(quote_identifier(column, style));
        args.push(value.clone());
    }

    let sql = format!(
        "insert into {} ({}) values ({})",
        quote_identifier(table, style),
        columns.join(","),
        vec!["?"; columns.len()].join(",")
    );
    Ok((sql, args))
}
