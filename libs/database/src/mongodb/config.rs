#[cfg(feature = "config")]
use core_config::{ConfigError, FromEnv};

/// MongoDB connection settings
///
/// # Example
///
/// ```ignore
/// use database::mongodb::MongoConfig;
///
/// let config = MongoConfig::with_database("mongodb://localhost:27017", "catalog")
///     .with_app_name("tool-sync-worker");
///
/// // From environment variables (requires `config` feature)
/// let config = MongoConfig::from_env()?;
/// ```
#[derive(Clone, Debug)]
pub struct MongoConfig {
    /// Format: mongodb://[username:password@]host[:port][/database][?options]
    pub url: String,

    pub database: String,

    /// Optional application name for server logs
    pub app_name: Option<String>,

    pub max_pool_size: u32,

    pub min_pool_size: u32,

    pub connect_timeout_secs: u64,

    pub server_selection_timeout_secs: u64,
}

impl MongoConfig {
    /// Create a config for `url` using the default database
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Create a config for `url` and a specific database
    pub fn with_database(url: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            database: database.into(),
            ..Self::default()
        }
    }

    /// Set the application name for server logs
    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = Some(app_name.into());
        self
    }

    pub fn with_pool_size(mut self, max_pool_size: u32, min_pool_size: u32) -> Self {
        self.max_pool_size = max_pool_size;
        self.min_pool_size = min_pool_size;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn database(&self) -> &str {
        &self.database
    }
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            url: "mongodb://localhost:27017".to_string(),
            database: "catalog".to_string(),
            app_name: None,
            max_pool_size: 20,
            min_pool_size: 1,
            connect_timeout_secs: 10,
            server_selection_timeout_secs: 30,
        }
    }
}

#[cfg(feature = "config")]
impl From<core_config::mongodb::MongoConfig> for MongoConfig {
    fn from(config: core_config::mongodb::MongoConfig) -> Self {
        Self::with_database(config.uri, config.database)
    }
}

/// Load MongoConfig from environment variables
///
/// - `MONGO_URI` (required)
/// - `MONGO_DATABASE` (default: "catalog")
/// - `MONGO_APP_NAME` (optional)
/// - `MONGO_MAX_POOL_SIZE` (default: 20)
/// - `MONGO_MIN_POOL_SIZE` (default: 1)
#[cfg(feature = "config")]
impl FromEnv for MongoConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let base: MongoConfig = core_config::mongodb::MongoConfig::from_env()?.into();
        let max_pool_size = core_config::env_parse("MONGO_MAX_POOL_SIZE", base.max_pool_size)?;
        let min_pool_size = core_config::env_parse("MONGO_MIN_POOL_SIZE", base.min_pool_size)?;

        let mut config = base.with_pool_size(max_pool_size, min_pool_size);
        config.app_name = core_config::env_optional("MONGO_APP_NAME");
        Ok(config)
    }
}
