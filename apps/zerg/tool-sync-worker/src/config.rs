use core_config::{FromEnv, env_or_default, env_parse};
use database::mongodb::MongoConfig;
use domain_tool_sync::{SweepConfig, SyncServiceConfig};
use domain_vector::{OpenAIConfig, QdrantConfig};
use eyre::WrapErr;

// Re-export Environment for use in other modules
pub use core_config::Environment;

/// Worker configuration, composed from the shared config components
#[derive(Clone, Debug)]
pub struct Config {
    pub environment: Environment,
    pub mongodb: MongoConfig,
    /// Mongo collection holding the tools
    pub tools_collection: String,
    pub qdrant: QdrantConfig,
    pub openai: OpenAIConfig,
    /// Cached embeddings; 0 disables the cache
    pub embedding_cache_capacity: u64,
    pub sync: SyncServiceConfig,
    pub sweep: SweepConfig,
    /// Prometheus exporter port
    pub metrics_port: u16,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        Ok(Self {
            environment: Environment::from_env(),
            mongodb: MongoConfig::from_env().wrap_err("Invalid MongoDB configuration")?,
            tools_collection: env_or_default("TOOLS_COLLECTION", "tools"),
            qdrant: QdrantConfig::from_env().wrap_err("Invalid Qdrant configuration")?,
            openai: OpenAIConfig::from_env().wrap_err("Invalid OpenAI configuration")?,
            embedding_cache_capacity: env_parse("EMBEDDING_CACHE_CAPACITY", 10_000)?,
            sync: SyncServiceConfig::from_env().wrap_err("Invalid sync configuration")?,
            sweep: SweepConfig::from_env().wrap_err("Invalid sweep configuration")?,
            metrics_port: env_parse("METRICS_PORT", 9464)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env_defaults() {
        temp_env::with_vars(
            [
                ("MONGO_URI", Some("mongodb://localhost:27017")),
                ("OPENAI_API_KEY", Some("sk-test")),
                ("TOOLS_COLLECTION", None),
                ("EMBEDDING_CACHE_CAPACITY", None),
                ("METRICS_PORT", None),
                ("SWEEP_BATCH_SIZE", None),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.tools_collection, "tools");
                assert_eq!(config.embedding_cache_capacity, 10_000);
                assert_eq!(config.metrics_port, 9464);
                assert_eq!(config.sweep.batch_size, 50);
                assert_eq!(config.mongodb.database(), "catalog");
            },
        );
    }

    #[test]
    fn test_config_requires_api_key() {
        temp_env::with_vars(
            [
                ("MONGO_URI", Some("mongodb://localhost:27017")),
                ("OPENAI_API_KEY", None),
            ],
            || {
                let err = Config::from_env().unwrap_err();
                assert!(err.chain().any(|e| e.to_string().contains("OPENAI_API_KEY")));
            },
        );
    }

    #[test]
    fn test_config_rejects_bad_port() {
        temp_env::with_vars(
            [
                ("MONGO_URI", Some("mongodb://localhost:27017")),
                ("OPENAI_API_KEY", Some("sk-test")),
                ("METRICS_PORT", Some("not-a-port")),
            ],
            || {
                assert!(Config::from_env().is_err());
            },
        );
    }
}
