use std::sync::{Arc, OnceLock};

use crate::driver::{Connector, PhysicalConnection};
use crate::error::DbError;
use crate::translation::PlaceholderStyle;

#[cfg(feature = "sqlite")]
use crate::config::EngineConfig;

static ENGINE: OnceLock<Engine> = OnceLock::new();

/// Process-wide factory for physical connections.
///
/// Cheap to clone; every clone shares the same [`Connector`]. The engine never
/// opens a connection itself; each worker's lazy connection calls
/// [`Engine::connect`] on its first statement.
#[derive(Debug, Clone)]
pub struct Engine {
    connector: Arc<dyn Connector>,
    placeholder_style: PlaceholderStyle,
}

impl Engine {
    #[must_use]
    pub fn new(connector: impl Connector + 'static) -> Self {
        let placeholder_style = connector.placeholder_style();
        Self {
            connector: Arc::new(connector),
            placeholder_style,
        }
    }

    /// Override the marker the portable `?` token is rewritten to.
    #[must_use]
    pub fn with_placeholder_style(mut self, style: PlaceholderStyle) -> Self {
        self.placeholder_style = style;
        self
    }

    #[must_use]
    pub fn placeholder_style(&self) -> PlaceholderStyle {
        self.placeholder_style
    }

    /// Whether `other` shares this engine's connector and marker style.
    #[must_use]
    pub fn same_as(&self, other: &Engine) -> bool {
        Arc::as_ptr(&self.connector).cast::<()>() == Arc::as_ptr(&other.connector).cast::<()>()
            && self.placeholder_style == other.placeholder_style
    }

    /// Open a new physical connection through the stored factory.
    ///
    /// # Errors
    /// Returns the connector's error unchanged.
    pub fn connect(&self) -> Result<Box<dyn PhysicalConnection>, DbError> {
        self.connector.connect()
    }

    /// Build an engine for `config` without installing it process-wide.
    ///
    /// # Errors
    /// Returns `DbError::ConfigError` if the configuration cannot be applied.
    #[cfg(feature = "sqlite")]
    pub fn from_config(config: EngineConfig) -> Result<Self, DbError> {
        let style = config.placeholder_style;
        let engine = Engine::new(crate::sqlite::SqliteConnector::new(config)?);
        Ok(match style {
            Some(style) => engine.with_placeholder_style(style),
            None => engine,
        })
    }
}

/// Create the process-wide engine from connection settings.
///
/// Must be called exactly once, before any scope or helper uses the global engine.
///
/// # Errors
/// Returns `DbError::EngineAlreadyInitialized` if an engine is already installed
/// (the existing engine is kept), or a configuration error.
#[cfg(feature = "sqlite")]
pub fn create_engine(config: EngineConfig) -> Result<&'static Engine, DbError> {
    if ENGINE.get().is_some() {
        return Err(DbError::EngineAlreadyInitialized);
    }
    let (user, host, port, database) = (
        config.user.clone(),
        config.host.clone(),
        config.port,
        config.database.clone(),
    );
    let engine = init_engine(Engine::from_config(config)?)?;
    tracing::info!(%user, %host, port, %database, "init engine ok");
    Ok(engine)
}

/// Install an engine built from any [`Connector`] as the process-wide engine.
///
/// # Errors
/// Returns `DbError::EngineAlreadyInitialized` if an engine is already installed.
pub fn init_engine(engine: Engine) -> Result<&'static Engine, DbError> {
    let mut installed = false;
    let current = ENGINE.get_or_init(|| {
        installed = true;
        engine
    });
    if installed {
        Ok(current)
    } else {
        Err(DbError::EngineAlreadyInitialized)
    }
}

/// The process-wide engine.
///
/// # Errors
/// Returns `DbError::EngineNotInitialized` before `create_engine`/`init_engine` succeeded.
pub fn engine() -> Result<&'static Engine, DbError> {
    ENGINE.get().ok_or(DbError::EngineNotInitialized)
}
