use rusqlite::types::Value;
use serde_json::Value as JsonValue;

use crate::config::EngineConfig;
use crate::driver::{Connector, PhysicalConnection};
use crate::error::DbError;
use crate::translation::PlaceholderStyle;

use super::connection::SqliteConnection;

/// Opens `SQLite` connections for an [`EngineConfig`].
///
/// `database` is the file path (`:memory:` works but gives every worker its own
/// private database). `user`, `password`, `host` and `port` have no meaning for
/// `SQLite` and are only logged. Unrecognized options are applied as `PRAGMA`s.
#[derive(Debug, Clone)]
pub struct SqliteConnector {
    db_path: String,
    encoding: &'static str,
    autocommit: bool,
    pragmas: Vec<(String, Value)>,
}

impl SqliteConnector {
    /// Validate `config` and capture what each new connection needs.
    ///
    /// # Errors
    /// Returns `DbError::ConfigError` for an unsupported charset or a passthrough
    /// option that is not a valid pragma name/value.
    pub fn new(config: EngineConfig) -> Result<Self, DbError> {
        let encoding = match config.charset.to_ascii_lowercase().as_str() {
            "utf8" | "utf-8" | "utf8mb4" => "UTF-8",
            "utf16" | "utf-16" => "UTF-16",
            "utf16le" | "utf-16le" => "UTF-16le",
            "utf16be" | "utf-16be" => "UTF-16be",
            other => {
                return Err(DbError::ConfigError(format!(
                    "charset {other:?} is not supported by SQLite"
                )));
            }
        };

        let mut pragmas = Vec::with_capacity(config.options.len());
        for (key, value) in &config.options {
            if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(DbError::ConfigError(format!(
                    "option {key:?} is not a valid SQLite pragma name"
                )));
            }
            pragmas.push((key.clone(), pragma_value(key, value)?));
        }

        tracing::debug!(
            user = %config.user,
            host = %config.host,
            port = config.port,
            collation = %config.collation,
            use_unicode = config.use_unicode,
            "connection settings without a SQLite counterpart are ignored"
        );

        Ok(Self {
            db_path: config.database,
            encoding,
            autocommit: config.autocommit,
            pragmas,
        })
    }

    #[must_use]
    pub fn db_path(&self) -> &str {
        &self.db_path
    }
}

fn pragma_value(key: &str, value: &JsonValue) -> Result<Value, DbError> {
    match value {
        JsonValue::Bool(b) => Ok(Value::Integer(i64::from(*b))),
        JsonValue::Number(n) => n
            .as_i64()
            .map(Value::Integer)
            .or_else(|| n.as_f64().map(Value::Real))
            .ok_or_else(|| DbError::ConfigError(format!("option {key}: unsupported number {n}"))),
        JsonValue::String(s) => Ok(Value::Text(s.clone())),
        other => Err(DbError::ConfigError(format!(
            "option {key}: expected a scalar, got {other}"
        ))),
    }
}

fn pragma_literal(value: &Value) -> String {
    match value {
        Value::Integer(i) => i.to_string(),
        Value::Real(f) => f.to_string(),
        Value::Text(s) => format!("'{}'", s.replace('\'', "''")),
        Value::Null | Value::Blob(_) => "NULL".to_string(),
    }
}

impl Connector for SqliteConnector {
    fn connect(&self) -> Result<Box<dyn PhysicalConnection>, DbError> {
        let conn = rusqlite::Connection::open(&self.db_path).map_err(|e| {
            DbError::ConnectionError(format!("failed to open SQLite database {}: {e}", self.db_path))
        })?;
        // only takes effect on a database that has no content yet
        conn.execute_batch(&format!("PRAGMA encoding = '{}'", self.encoding))?;
        for (name, value) in &self.pragmas {
            conn.execute_batch(&format!("PRAGMA {name} = {}", pragma_literal(value)))?;
        }
        Ok(Box::new(SqliteConnection::new(conn, self.autocommit)))
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Sqlite
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_charset() {
        let mut cfg = EngineConfig::new("u", "p", ":memory:");
        cfg.charset = "latin1".into();
        assert!(matches!(
            SqliteConnector::new(cfg),
            Err(DbError::ConfigError(_))
        ));
    }

    #[test]
    fn rejects_pragma_names_that_are_not_identifiers() {
        let cfg = EngineConfig::builder("u", "p", ":memory:")
            .option("busy_timeout; drop table x", 1)
            .finish()
            .unwrap();
        assert!(matches!(
            SqliteConnector::new(cfg),
            Err(DbError::ConfigError(_))
        ));
    }

    #[test]
    fn applies_passthrough_pragmas() {
        let cfg = EngineConfig::builder("u", "p", ":memory:")
            .option("busy_timeout", 1234)
            .finish()
            .unwrap();
        let connector = SqliteConnector::new(cfg).unwrap();
        let mut conn = connector.connect().unwrap();
        let rs = conn.query("PRAGMA busy_timeout", &[]).unwrap();
        assert_eq!(
            rs.results[0].get_by_index(0),
            Some(&crate::types::RowValues::Int(1234))
        );
        conn.close().unwrap();
    }
}
