//! Store factory for runtime selection

use std::sync::Arc;

use serde::Deserialize;

use crate::domain::store::KeyValueStore;
use crate::domain::DomainError;

use super::in_memory::InMemoryStore;
use super::redis::{RedisStore, RedisStoreConfig};

/// Supported store types
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreType {
    /// Process-local store
    #[default]
    InMemory,
    /// Shared Redis store
    Redis,
}

impl std::fmt::Display for StoreType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreType::InMemory => write!(f, "in_memory"),
            StoreType::Redis => write!(f, "redis"),
        }
    }
}

impl std::str::FromStr for StoreType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "in_memory" | "inmemory" | "memory" => Ok(StoreType::InMemory),
            "redis" => Ok(StoreType::Redis),
            _ => Err(DomainError::configuration(format!(
                "Unknown store type: {}. Valid types: in_memory, redis",
                s
            ))),
        }
    }
}

/// Configuration for store factory
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Type of store to create
    #[serde(rename = "type")]
    pub store_type: StoreType,
    /// Redis URL (required for Redis type)
    pub redis_url: Option<String>,
    /// Key prefix for namespacing (Redis only)
    pub key_prefix: Option<String>,
}

impl StoreConfig {
    /// Creates a new configuration for the in-memory store
    pub fn in_memory() -> Self {
        Self {
            store_type: StoreType::InMemory,
            ..Default::default()
        }
    }

    /// Creates a new configuration for the Redis store
    pub fn redis(url: impl Into<String>) -> Self {
        Self {
            store_type: StoreType::Redis,
            redis_url: Some(url.into()),
            ..Default::default()
        }
    }

    /// Sets the key prefix
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }
}

/// Factory for creating store instances
#[derive(Debug, Default)]
pub struct StoreFactory;

impl StoreFactory {
    /// Creates a new store factory
    pub fn new() -> Self {
        Self
    }

    /// Creates a store instance based on configuration
    pub async fn create(&self, config: &StoreConfig) -> Result<Arc<dyn KeyValueStore>, DomainError> {
        match config.store_type {
            StoreType::InMemory => Ok(Arc::new(InMemoryStore::new())),
            StoreType::Redis => {
                let url = config.redis_url.clone().ok_or_else(|| {
                    DomainError::configuration("Redis URL is required for Redis store type")
                })?;

                let mut redis_config = RedisStoreConfig::new(url);

                if let Some(prefix) = &config.key_prefix {
                    redis_config = redis_config.with_key_prefix(prefix.clone());
                }

                let store = RedisStore::new(redis_config).await?;
                Ok(Arc::new(store))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_type_from_str() {
        assert_eq!("in_memory".parse::<StoreType>().unwrap(), StoreType::InMemory);
        assert_eq!("memory".parse::<StoreType>().unwrap(), StoreType::InMemory);
        assert_eq!("redis".parse::<StoreType>().unwrap(), StoreType::Redis);
        assert_eq!("REDIS".parse::<StoreType>().unwrap(), StoreType::Redis);
        assert!("memcached".parse::<StoreType>().is_err());
    }

    #[test]
    fn test_store_type_display() {
        assert_eq!(StoreType::InMemory.to_string(), "in_memory");
        assert_eq!(StoreType::Redis.to_string(), "redis");
    }

    #[test]
    fn test_store_config_redis() {
        let config = StoreConfig::redis("redis://localhost:6379").with_key_prefix("ab");

        assert_eq!(config.store_type, StoreType::Redis);
        assert_eq!(config.redis_url, Some("redis://localhost:6379".to_string()));
        assert_eq!(config.key_prefix, Some("ab".to_string()));
    }

    #[tokio::test]
    async fn test_factory_create_in_memory() {
        let store = StoreFactory::new()
            .create(&StoreConfig::in_memory())
            .await
            .unwrap();

        store.set("test", "value").await.unwrap();
        assert_eq!(store.get("test").await.unwrap(), Some("value".to_string()));
    }

    #[tokio::test]
    async fn test_factory_create_redis_missing_url() {
        let config = StoreConfig {
            store_type: StoreType::Redis,
            redis_url: None,
            ..Default::default()
        };

        let result = StoreFactory::new().create(&config).await;
        assert!(matches!(result, Err(DomainError::Configuration { .. })));
    }
}
