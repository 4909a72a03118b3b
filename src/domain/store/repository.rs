//! Key-value store trait definition

use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::str::FromStr;

use async_trait::async_trait;

use crate::domain::DomainError;

/// Type of the value stored under a key, as reported by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    None,
    String,
    List,
    Set,
    Hash,
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::String => write!(f, "string"),
            Self::List => write!(f, "list"),
            Self::Set => write!(f, "set"),
            Self::Hash => write!(f, "hash"),
        }
    }
}

impl FromStr for KeyType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "string" => Ok(Self::String),
            "list" => Ok(Self::List),
            "set" => Ok(Self::Set),
            "hash" => Ok(Self::Hash),
            other => Err(DomainError::storage(format!(
                "Unsupported key type: {}",
                other
            ))),
        }
    }
}

/// Shared key-value store holding all experiment state
///
/// Every operation is a single store primitive. Callers compose them and
/// must not assume atomicity across calls.
#[async_trait]
pub trait KeyValueStore: Send + Sync + Debug {
    /// Gets a string value
    async fn get(&self, key: &str) -> Result<Option<String>, DomainError>;

    /// Sets a string value
    async fn set(&self, key: &str, value: &str) -> Result<(), DomainError>;

    /// Deletes a key of any type, returning whether it existed
    async fn delete(&self, key: &str) -> Result<bool, DomainError>;

    /// Checks if a key exists
    async fn exists(&self, key: &str) -> Result<bool, DomainError> {
        Ok(self.key_type(key).await? != KeyType::None)
    }

    /// Reports the type of the value stored under a key
    async fn key_type(&self, key: &str) -> Result<KeyType, DomainError>;

    /// Atomically increments an integer value, returning the new value
    async fn increment(&self, key: &str, delta: i64) -> Result<i64, DomainError>;

    /// Prepends a value to a list, returning the new length
    async fn lpush(&self, key: &str, value: &str) -> Result<usize, DomainError>;

    /// Reads a range of a list (negative indexes count from the end)
    async fn lrange(&self, key: &str, start: isize, stop: isize)
        -> Result<Vec<String>, DomainError>;

    /// Adds a member to a set, returning whether it was newly added
    async fn sadd(&self, key: &str, member: &str) -> Result<bool, DomainError>;

    /// Removes a member from a set, returning whether it was present
    async fn srem(&self, key: &str, member: &str) -> Result<bool, DomainError>;

    /// Lists all members of a set
    async fn smembers(&self, key: &str) -> Result<Vec<String>, DomainError>;

    /// Sets a hash field
    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<(), DomainError>;

    /// Gets a hash field
    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>, DomainError>;

    /// Gets every field of a hash
    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>, DomainError>;

    /// Deletes a hash field, returning whether it existed
    async fn hdel(&self, key: &str, field: &str) -> Result<bool, DomainError>;

    /// Atomically increments an integer hash field, returning the new value
    async fn hincrby(&self, key: &str, field: &str, delta: i64) -> Result<i64, DomainError>;
}
