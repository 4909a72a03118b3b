//! Redis key-value store implementation

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

use crate::domain::store::{KeyType, KeyValueStore};
use crate::domain::DomainError;

/// Configuration for the Redis store
#[derive(Debug, Clone)]
pub struct RedisStoreConfig {
    /// Redis connection URL (e.g., "redis://127.0.0.1:6379")
    pub url: String,
    /// Key prefix for namespacing
    pub key_prefix: Option<String>,
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: None,
        }
    }
}

impl RedisStoreConfig {
    /// Creates a new configuration with the given URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Sets the key prefix
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }
}

/// Redis store shared by every client process
///
/// Each trait method maps onto exactly one Redis command, so the atomicity
/// guarantees are those of the individual commands.
#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
    config: RedisStoreConfig,
}

impl fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStore")
            .field("config", &self.config)
            .field("connection", &"<ConnectionManager>")
            .finish()
    }
}

impl RedisStore {
    /// Creates a new Redis store connection
    pub async fn new(config: RedisStoreConfig) -> Result<Self, DomainError> {
        let client = Client::open(config.url.as_str())
            .map_err(|e| DomainError::storage(format!("Failed to create Redis client: {}", e)))?;

        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to connect to Redis: {}", e)))?;

        Ok(Self { connection, config })
    }

    /// Creates a Redis store with default configuration
    pub async fn with_url(url: impl Into<String>) -> Result<Self, DomainError> {
        Self::new(RedisStoreConfig::new(url)).await
    }

    fn prefix_key(&self, key: &str) -> String {
        prefixed(self.config.key_prefix.as_deref(), key)
    }
}

fn prefixed(prefix: Option<&str>, key: &str) -> String {
    match prefix {
        Some(prefix) => format!("{}:{}", prefix, key),
        None => key.to_string(),
    }
}

fn command_error(command: &str, key: &str, error: redis::RedisError) -> DomainError {
    DomainError::storage(format!("{} '{}' failed: {}", command, key, error))
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, DomainError> {
        let mut conn = self.connection.clone();

        conn.get(self.prefix_key(key))
            .await
            .map_err(|e| command_error("GET", key, e))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), DomainError> {
        let mut conn = self.connection.clone();

        conn.set(self.prefix_key(key), value)
            .await
            .map_err(|e| command_error("SET", key, e))
    }

    async fn delete(&self, key: &str) -> Result<bool, DomainError> {
        let mut conn = self.connection.clone();

        let deleted: i64 = conn
            .del(self.prefix_key(key))
            .await
            .map_err(|e| command_error("DEL", key, e))?;

        Ok(deleted > 0)
    }

    async fn exists(&self, key: &str) -> Result<bool, DomainError> {
        let mut conn = self.connection.clone();

        conn.exists(self.prefix_key(key))
            .await
            .map_err(|e| command_error("EXISTS", key, e))
    }

    async fn key_type(&self, key: &str) -> Result<KeyType, DomainError> {
        let mut conn = self.connection.clone();

        let reply: String = redis::cmd("TYPE")
            .arg(self.prefix_key(key))
            .query_async(&mut conn)
            .await
            .map_err(|e| command_error("TYPE", key, e))?;

        reply.parse()
    }

    async fn increment(&self, key: &str, delta: i64) -> Result<i64, DomainError> {
        let mut conn = self.connection.clone();

        conn.incr(self.prefix_key(key), delta)
            .await
            .map_err(|e| command_error("INCRBY", key, e))
    }

    async fn lpush(&self, key: &str, value: &str) -> Result<usize, DomainError> {
        let mut conn = self.connection.clone();

        conn.lpush(self.prefix_key(key), value)
            .await
            .map_err(|e| command_error("LPUSH", key, e))
    }

    async fn lrange(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> Result<Vec<String>, DomainError> {
        let mut conn = self.connection.clone();

        conn.lrange(self.prefix_key(key), start, stop)
            .await
            .map_err(|e| command_error("LRANGE", key, e))
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<bool, DomainError> {
        let mut conn = self.connection.clone();

        let added: i64 = conn
            .sadd(self.prefix_key(key), member)
            .await
            .map_err(|e| command_error("SADD", key, e))?;

        Ok(added > 0)
    }

    async fn srem(&self, key: &str, member: &str) -> Result<bool, DomainError> {
        let mut conn = self.connection.clone();

        let removed: i64 = conn
            .srem(self.prefix_key(key), member)
            .await
            .map_err(|e| command_error("SREM", key, e))?;

        Ok(removed > 0)
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>, DomainError> {
        let mut conn = self.connection.clone();

        conn.smembers(self.prefix_key(key))
            .await
            .map_err(|e| command_error("SMEMBERS", key, e))
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<(), DomainError> {
        let mut conn = self.connection.clone();

        let _: i64 = conn
            .hset(self.prefix_key(key), field, value)
            .await
            .map_err(|e| command_error("HSET", key, e))?;

        Ok(())
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>, DomainError> {
        let mut conn = self.connection.clone();

        conn.hget(self.prefix_key(key), field)
            .await
            .map_err(|e| command_error("HGET", key, e))
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>, DomainError> {
        let mut conn = self.connection.clone();

        conn.hgetall(self.prefix_key(key))
            .await
            .map_err(|e| command_error("HGETALL", key, e))
    }

    async fn hdel(&self, key: &str, field: &str) -> Result<bool, DomainError> {
        let mut conn = self.connection.clone();

        let removed: i64 = conn
            .hdel(self.prefix_key(key), field)
            .await
            .map_err(|e| command_error("HDEL", key, e))?;

        Ok(removed > 0)
    }

    async fn hincrby(&self, key: &str, field: &str, delta: i64) -> Result<i64, DomainError> {
        let mut conn = self.connection.clone();

        conn.hincr(self.prefix_key(key), field, delta)
            .await
            .map_err(|e| command_error("HINCRBY", key, e))
    }
}
