use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::error::DbError;
use crate::translation::PlaceholderStyle;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3306;
pub const DEFAULT_CHARSET: &str = "utf8";
pub const DEFAULT_COLLATION: &str = "utf8_general_ci";

/// Connection settings captured by `create_engine`.
///
/// Recognized options have typed fields with fixed defaults; anything else is
/// kept in `options` and handed to the driver unchanged. Loading from JSON
/// follows the same rules:
/// ```rust
/// use sql_scope::prelude::*;
///
/// let cfg = EngineConfig::from_json_str(
///     r#"{"user": "root", "password": "pw", "database": "blog.db", "busy_timeout": 500}"#,
/// )?;
/// assert_eq!(cfg.port, 3306);
/// assert!(!cfg.autocommit);
/// assert_eq!(cfg.options["busy_timeout"], 500);
/// # Ok::<(), DbError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EngineConfig {
    pub user: String,
    #[serde(default)]
    pub password: String,
    pub database: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_true")]
    pub use_unicode: bool,
    #[serde(default = "default_charset")]
    pub charset: String,
    #[serde(default = "default_collation")]
    pub collation: String,
    #[serde(default)]
    pub autocommit: bool,
    /// Results are always read completely before the next statement runs.
    #[serde(default = "default_true")]
    pub buffered: bool,
    /// Overrides the driver's native marker when set.
    #[serde(default)]
    pub placeholder_style: Option<PlaceholderStyle>,
    /// Unrecognized driver options, passed through as given.
    #[serde(flatten)]
    pub options: BTreeMap<String, JsonValue>,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_true() -> bool {
    true
}

fn default_charset() -> String {
    DEFAULT_CHARSET.to_string()
}

fn default_collation() -> String {
    DEFAULT_COLLATION.to_string()
}

impl EngineConfig {
    #[must_use]
    pub fn new(user: &str, password: &str, database: &str) -> Self {
        Self {
            user: user.to_string(),
            password: password.to_string(),
            database: database.to_string(),
            host: default_host(),
            port: DEFAULT_PORT,
            use_unicode: true,
            charset: default_charset(),
            collation: default_collation(),
            autocommit: false,
            buffered: true,
            placeholder_style: None,
            options: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn builder(user: &str, password: &str, database: &str) -> EngineConfigBuilder {
        EngineConfigBuilder::new(user, password, database)
    }

    /// Parse a configuration from a JSON object.
    ///
    /// # Errors
    /// Returns `DbError::ConfigError` if the JSON is malformed or misses required fields.
    pub fn from_json_str(json: &str) -> Result<Self, DbError> {
        let mut cfg: EngineConfig = serde_json::from_str(json)
            .map_err(|e| DbError::ConfigError(format!("invalid engine config: {e}")))?;
        cfg.buffered = true;
        Ok(cfg)
    }

    /// Merge one option over the current settings.
    ///
    /// # Errors
    /// Returns `DbError::ConfigError` when a recognized option has a value of the wrong type.
    pub fn set_option(&mut self, key: &str, value: JsonValue) -> Result<(), DbError> {
        match key {
            "use_unicode" => self.use_unicode = bool_option(key, &value)?,
            "charset" => self.charset = string_option(key, &value)?,
            "collation" => self.collation = string_option(key, &value)?,
            "autocommit" => self.autocommit = bool_option(key, &value)?,
            "buffered" => {
                if !bool_option(key, &value)? {
                    tracing::warn!("unbuffered results are not supported; keeping buffered = true");
                }
            }
            "placeholder_style" => {
                let name = string_option(key, &value)?;
                let style = <PlaceholderStyle as clap::ValueEnum>::from_str(&name, true)
                    .map_err(|e| DbError::ConfigError(format!("placeholder_style: {e}")))?;
                self.placeholder_style = Some(style);
            }
            _ => {
                self.options.insert(key.to_string(), value);
            }
        }
        Ok(())
    }

    /// Passthrough options rendered as plain strings, in key order.
    pub fn passthrough(&self) -> impl Iterator<Item = (&str, String)> {
        self.options.iter().map(|(key, value)| {
            let rendered = match value {
                JsonValue::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.as_str(), rendered)
        })
    }
}

fn bool_option(key: &str, value: &JsonValue) -> Result<bool, DbError> {
    match value {
        JsonValue::Bool(b) => Ok(*b),
        JsonValue::Number(n) if n.as_i64() == Some(1) => Ok(true),
        JsonValue::Number(n) if n.as_i64() == Some(0) => Ok(false),
        JsonValue::String(s) => match s.to_ascii_lowercase().as_str() {
            "true" | "1" | "on" | "yes" => Ok(true),
            "false" | "0" | "off" | "no" => Ok(false),
            _ => Err(DbError::ConfigError(format!(
                "{key}: expected a boolean, got {s:?}"
            ))),
        },
        other => Err(DbError::ConfigError(format!(
            "{key}: expected a boolean, got {other}"
        ))),
    }
}

fn string_option(key: &str, value: &JsonValue) -> Result<String, DbError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| DbError::ConfigError(format!("{key}: expected a string, got {value}")))
}

/// Fluent builder for [`EngineConfig`].
#[derive(Debug)]
pub struct EngineConfigBuilder {
    cfg: EngineConfig,
    error: Option<DbError>,
}

impl EngineConfigBuilder {
    #[must_use]
    pub fn new(user: &str, password: &str, database: &str) -> Self {
        Self {
            cfg: EngineConfig::new(user, password, database),
            error: None,
        }
    }

    #[must_use]
    pub fn host(mut self, host: &str) -> Self {
        self.cfg.host = host.to_string();
        self
    }

    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.cfg.port = port;
        self
    }

    #[must_use]
    pub fn placeholder_style(mut self, style: PlaceholderStyle) -> Self {
        self.cfg.placeholder_style = Some(style);
        self
    }

    /// Merge an option; the first invalid option is reported by [`finish`](Self::finish).
    #[must_use]
    pub fn option(mut self, key: &str, value: impl Into<JsonValue>) -> Self {
        if self.error.is_none()
            && let Err(e) = self.cfg.set_option(key, value.into())
        {
            self.error = Some(e);
        }
        self
    }

    /// # Errors
    /// Returns the first `DbError::ConfigError` raised while merging options.
    pub fn finish(self) -> Result<EngineConfig, DbError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.cfg),
        }
    }

    /// Finish the configuration and install it as the process-wide engine.
    ///
    /// # Errors
    /// Returns `DbError::EngineAlreadyInitialized` on a second call, or a config error.
    #[cfg(feature = "sqlite")]
    pub fn build(self) -> Result<&'static crate::engine::Engine, DbError> {
        crate::engine::create_engine(self.finish()?)
    }
}
