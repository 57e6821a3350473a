//! Configuration for connecting a model layer to its store.
//!
//! Settings come from a TOML file (`firefly.toml` by default) and are then
//! overridden by environment variables:
//!
//! | Variable | Setting |
//! |---|---|
//! | `FIREFLY_BACKEND` | `store.backend` (`memory` or `mongodb`) |
//! | `FIREFLY_MONGODB_URI` | `store.mongodb.uri` |
//! | `FIREFLY_MONGODB_DATABASE` | `store.mongodb.database` |
//! | `FIREFLY_DEFAULT_LIMIT` | `store.default_limit` |
//! | `FIREFLY_LOG_LEVEL` | `logging.level` |
//!
//! ```toml
//! [store]
//! backend = "mongodb"
//! default_limit = 200
//!
//! [store.mongodb]
//! uri = "mongodb://localhost:27017"
//! database = "fireflies"
//!
//! [logging]
//! level = "debug"
//! ```

use serde::{Deserialize, Serialize};
use std::{fmt, path::Path, str::FromStr};
use thiserror::Error;

use firefly_core::{
    error::{StoreError, StoreResult},
    store::{DEFAULT_LIMIT, DocumentStore, DynDocumentStore, StoreOptions},
};
use firefly_memory::InMemoryStore;

/// File read by [`FireflyConfig::load`].
pub const DEFAULT_CONFIG_FILE: &str = "firefly.toml";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid value for {var}: {reason}")]
    InvalidValue { var: &'static str, reason: String },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Which store backend to connect to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Memory,
    MongoDb,
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(BackendKind::Memory),
            "mongodb" => Ok(BackendKind::MongoDb),
            other => Err(ConfigError::InvalidValue {
                var: "FIREFLY_BACKEND",
                reason: format!("unknown backend `{other}`"),
            }),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BackendKind::Memory => "memory",
            BackendKind::MongoDb => "mongodb",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: BackendKind,
    pub mongodb: Option<MongoConfig>,
    /// Result cap for equality and ordered queries.
    pub default_limit: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Memory,
            mongodb: None,
            default_limit: DEFAULT_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FireflyConfig {
    pub store: StoreConfig,
    pub logging: LoggingConfig,
}

impl FireflyConfig {
    /// Loads `firefly.toml` if present, applies environment overrides and validates.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = if Path::new(DEFAULT_CONFIG_FILE).exists() {
            Self::from_file(DEFAULT_CONFIG_FILE)?
        } else {
            Self::default()
        };

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Parses a TOML file without applying overrides or validating.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Applies `FIREFLY_*` environment variables on top of the current settings.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Applies overrides from any variable source.
    pub fn apply_overrides<F>(&mut self, var: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(backend) = var("FIREFLY_BACKEND") {
            self.store.backend = backend.parse()?;
        }

        let uri = var("FIREFLY_MONGODB_URI");
        let database = var("FIREFLY_MONGODB_DATABASE");
        if uri.is_some() || database.is_some() {
            let mongodb = self.store.mongodb.get_or_insert_with(|| MongoConfig {
                uri: String::new(),
                database: String::new(),
            });
            if let Some(uri) = uri {
                mongodb.uri = uri;
            }
            if let Some(database) = database {
                mongodb.database = database;
            }
        }

        if let Some(limit) = var("FIREFLY_DEFAULT_LIMIT") {
            self.store.default_limit =
                limit.trim().parse().map_err(|e| ConfigError::InvalidValue {
                    var: "FIREFLY_DEFAULT_LIMIT",
                    reason: format!("{e}"),
                })?;
        }

        if let Some(level) = var("FIREFLY_LOG_LEVEL") {
            self.logging.level = level.trim().to_ascii_lowercase();
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.default_limit == 0 {
            return Err(ConfigError::Invalid("default_limit must be at least 1".into()));
        }

        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "unknown log level `{}`",
                self.logging.level
            )));
        }

        if self.store.backend == BackendKind::MongoDb {
            match &self.store.mongodb {
                Some(mongodb) if !mongodb.uri.is_empty() && !mongodb.database.is_empty() => {}
                _ => {
                    return Err(ConfigError::Invalid(
                        "the mongodb backend needs store.mongodb.uri and store.mongodb.database"
                            .into(),
                    ));
                }
            }
        }

        Ok(())
    }

    /// Builds a store for the configured backend.
    pub async fn connect(&self) -> StoreResult<DynDocumentStore> {
        let options = StoreOptions { default_limit: self.store.default_limit };

        tracing::info!(backend = %self.store.backend, "connecting document store");

        match self.store.backend {
            BackendKind::Memory => {
                Ok(DocumentStore::with_options(InMemoryStore::new(), options).into_dyn())
            }
            BackendKind::MongoDb => self.connect_mongodb(options).await,
        }
    }

    #[cfg(feature = "mongodb")]
    async fn connect_mongodb(&self, options: StoreOptions) -> StoreResult<DynDocumentStore> {
        use firefly_core::backend::StoreBackendBuilder;
        use firefly_mongodb::MongoDbStore;

        let Some(mongodb) = &self.store.mongodb else {
            return Err(StoreError::Initialization("missing store.mongodb settings".into()));
        };
        let backend = MongoDbStore::builder(&mongodb.uri, &mongodb.database)
            .build()
            .await?;

        Ok(DocumentStore::with_options(backend, options).into_dyn())
    }

    #[cfg(not(feature = "mongodb"))]
    async fn connect_mongodb(&self, _options: StoreOptions) -> StoreResult<DynDocumentStore> {
        Err(StoreError::Initialization(
            "firefly was built without the `mongodb` feature".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let config = FireflyConfig::default();

        assert_eq!(config.store.backend, BackendKind::Memory);
        assert_eq!(config.store.default_limit, 500);
        assert_eq!(config.logging.level, "info");
        config.validate().unwrap();
    }

    #[test]
    fn parses_partial_toml() {
        let config = FireflyConfig::from_toml_str(
            r#"
            [store]
            backend = "mongodb"

            [store.mongodb]
            uri = "mongodb://localhost:27017"
            database = "fireflies"
            "#,
        )
        .unwrap();

        assert_eq!(config.store.backend, BackendKind::MongoDb);
        assert_eq!(config.store.default_limit, 500);
        assert_eq!(config.store.mongodb.as_ref().unwrap().database, "fireflies");
        config.validate().unwrap();
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(matches!(
            FireflyConfig::from_toml_str("[store\nbackend = 1"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn environment_overrides_file_settings() {
        let mut config = FireflyConfig::default();
        config
            .apply_overrides(vars(&[
                ("FIREFLY_BACKEND", "MongoDB"),
                ("FIREFLY_MONGODB_URI", "mongodb://db:27017"),
                ("FIREFLY_MONGODB_DATABASE", "bugs"),
                ("FIREFLY_DEFAULT_LIMIT", "25"),
                ("FIREFLY_LOG_LEVEL", "DEBUG"),
            ]))
            .unwrap();

        assert_eq!(config.store.backend, BackendKind::MongoDb);
        assert_eq!(
            config.store.mongodb,
            Some(MongoConfig { uri: "mongodb://db:27017".into(), database: "bugs".into() })
        );
        assert_eq!(config.store.default_limit, 25);
        assert_eq!(config.logging.level, "debug");
        config.validate().unwrap();
    }

    #[test]
    fn rejects_bad_override_values() {
        let mut config = FireflyConfig::default();

        assert!(matches!(
            config.apply_overrides(vars(&[("FIREFLY_BACKEND", "firestore")])),
            Err(ConfigError::InvalidValue { var: "FIREFLY_BACKEND", .. })
        ));
        assert!(matches!(
            config.apply_overrides(vars(&[("FIREFLY_DEFAULT_LIMIT", "lots")])),
            Err(ConfigError::InvalidValue { var: "FIREFLY_DEFAULT_LIMIT", .. })
        ));
    }

    #[test]
    fn validation_catches_inconsistent_settings() {
        let mut config = FireflyConfig::default();
        config.store.default_limit = 0;
        assert!(config.validate().is_err());

        let mut config = FireflyConfig::default();
        config.logging.level = "loud".into();
        assert!(config.validate().is_err());

        let mut config = FireflyConfig::default();
        config.store.backend = BackendKind::MongoDb;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_is_a_read_error() {
        assert!(matches!(
            FireflyConfig::from_file("/definitely/not/here/firefly.toml"),
            Err(ConfigError::Read { .. })
        ));
    }
}
