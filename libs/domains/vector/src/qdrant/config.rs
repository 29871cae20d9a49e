use core_config::{ConfigError, FromEnv, env_optional, env_or_default, env_parse};

/// Qdrant connection configuration
#[derive(Debug, Clone)]
pub struct QdrantConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    /// Prepended to every logical collection name ("staging_" + "tools")
    pub collection_prefix: String,
}

impl QdrantConfig {
    pub fn new(url: String) -> Self {
        Self {
            url,
            ..Self::default()
        }
    }

    pub fn with_api_key(mut self, api_key: String) -> Self {
        self.api_key = Some(api_key);
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_collection_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.collection_prefix = prefix.into();
        self
    }
}

impl FromEnv for QdrantConfig {
    /// QDRANT_URL, QDRANT_API_KEY, QDRANT_TIMEOUT_SECS, QDRANT_COLLECTION_PREFIX
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            url: env_or_default("QDRANT_URL", "http://localhost:6334"),
            api_key: env_optional("QDRANT_API_KEY"),
            timeout_secs: env_parse("QDRANT_TIMEOUT_SECS", 30)?,
            collection_prefix: env_or_default("QDRANT_COLLECTION_PREFIX", ""),
        })
    }
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:6334".to_string(),
            api_key: None,
            timeout_secs: 30,
            collection_prefix: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qdrant_config_defaults() {
        temp_env::with_vars(
            [
                ("QDRANT_URL", None::<&str>),
                ("QDRANT_API_KEY", None),
                ("QDRANT_TIMEOUT_SECS", None),
                ("QDRANT_COLLECTION_PREFIX", None),
            ],
            || {
                let config = QdrantConfig::from_env().unwrap();
                assert_eq!(config.url, "http://localhost:6334");
                assert_eq!(config.api_key, None);
                assert_eq!(config.timeout_secs, 30);
                assert_eq!(config.collection_prefix, "");
            },
        );
    }

    #[test]
    fn test_qdrant_config_from_env() {
        temp_env::with_vars(
            [
                ("QDRANT_URL", Some("http://qdrant:6334")),
                ("QDRANT_API_KEY", Some("secret")),
                ("QDRANT_TIMEOUT_SECS", Some("5")),
                ("QDRANT_COLLECTION_PREFIX", Some("staging_")),
            ],
            || {
                let config = QdrantConfig::from_env().unwrap();
                assert_eq!(config.url, "http://qdrant:6334");
                assert_eq!(config.api_key.as_deref(), Some("secret"));
                assert_eq!(config.timeout_secs, 5);
                assert_eq!(config.collection_prefix, "staging_");
            },
        );
    }

    #[test]
    fn test_qdrant_config_invalid_timeout() {
        temp_env::with_var("QDRANT_TIMEOUT_SECS", Some("soon"), || {
            assert!(QdrantConfig::from_env().is_err());
        });
    }
}
