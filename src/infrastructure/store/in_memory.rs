//! In-memory key-value store with Redis-compatible semantics

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crate::domain::store::{KeyType, KeyValueStore};
use crate::domain::DomainError;

const WRONG_TYPE: &str = "WRONGTYPE Operation against a key holding the wrong kind of value";
const NOT_AN_INTEGER: &str = "ERR value is not an integer or out of range";

/// Value stored under one key
#[derive(Debug, Clone)]
enum StoredValue {
    String(String),
    List(VecDeque<String>),
    Set(BTreeSet<String>),
    Hash(HashMap<String, String>),
}

impl StoredValue {
    fn key_type(&self) -> KeyType {
        match self {
            Self::String(_) => KeyType::String,
            Self::List(_) => KeyType::List,
            Self::Set(_) => KeyType::Set,
            Self::Hash(_) => KeyType::Hash,
        }
    }

    fn is_empty_container(&self) -> bool {
        match self {
            Self::String(_) => false,
            Self::List(list) => list.is_empty(),
            Self::Set(set) => set.is_empty(),
            Self::Hash(hash) => hash.is_empty(),
        }
    }
}

/// Process-local store used for tests and single-process deployments
///
/// Containers that become empty are removed, and type mismatches fail the
/// way Redis does. Set members are kept sorted so reads are deterministic.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: RwLock<HashMap<String, StoredValue>>,
}

impl InMemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently held
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    /// Whether the store holds no keys
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, StoredValue>>, DomainError> {
        self.entries
            .read()
            .map_err(|e| DomainError::internal(format!("Failed to acquire read lock: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, StoredValue>>, DomainError> {
        self.entries
            .write()
            .map_err(|e| DomainError::internal(format!("Failed to acquire write lock: {}", e)))
    }

    fn remove_if_empty(entries: &mut HashMap<String, StoredValue>, key: &str) {
        if entries.get(key).is_some_and(StoredValue::is_empty_container) {
            entries.remove(key);
        }
    }
}

fn wrong_type() -> DomainError {
    DomainError::storage(WRONG_TYPE)
}

/// Resolve a Redis-style inclusive range against a list length
fn resolve_range(len: usize, start: isize, stop: isize) -> Option<(usize, usize)> {
    let len = len as isize;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };

    if len == 0 || start > stop || start >= len {
        None
    } else {
        Some((start as usize, stop as usize))
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, DomainError> {
        match self.read()?.get(key) {
            Some(StoredValue::String(value)) => Ok(Some(value.clone())),
            Some(_) => Err(wrong_type()),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), DomainError> {
        self.write()?
            .insert(key.to_string(), StoredValue::String(value.to_string()));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, DomainError> {
        Ok(self.write()?.remove(key).is_some())
    }

    async fn key_type(&self, key: &str) -> Result<KeyType, DomainError> {
        Ok(self
            .read()?
            .get(key)
            .map(StoredValue::key_type)
            .unwrap_or(KeyType::None))
    }

    async fn increment(&self, key: &str, delta: i64) -> Result<i64, DomainError> {
        let mut entries = self.write()?;

        let current = match entries.get(key) {
            Some(StoredValue::String(value)) => value
                .parse::<i64>()
                .map_err(|_| DomainError::storage(NOT_AN_INTEGER))?,
            Some(_) => return Err(wrong_type()),
            None => 0,
        };

        let new_value = current
            .checked_add(delta)
            .ok_or_else(|| DomainError::storage(NOT_AN_INTEGER))?;
        entries.insert(key.to_string(), StoredValue::String(new_value.to_string()));

        Ok(new_value)
    }

    async fn lpush(&self, key: &str, value: &str) -> Result<usize, DomainError> {
        let mut entries = self.write()?;

        let entry = entries
            .entry(key.to_string())
            .or_insert_with(|| StoredValue::List(VecDeque::new()));

        match entry {
            StoredValue::List(list) => {
                list.push_front(value.to_string());
                Ok(list.len())
            }
            _ => Err(wrong_type()),
        }
    }

    async fn lrange(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> Result<Vec<String>, DomainError> {
        match self.read()?.get(key) {
            Some(StoredValue::List(list)) => Ok(resolve_range(list.len(), start, stop)
                .map(|(s, e)| list.range(s..=e).cloned().collect())
                .unwrap_or_default()),
            Some(_) => Err(wrong_type()),
            None => Ok(Vec::new()),
        }
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<bool, DomainError> {
        let mut entries = self.write()?;

        let entry = entries
            .entry(key.to_string())
            .or_insert_with(|| StoredValue::Set(BTreeSet::new()));

        match entry {
            StoredValue::Set(set) => Ok(set.insert(member.to_string())),
            _ => Err(wrong_type()),
        }
    }

    async fn srem(&self, key: &str, member: &str) -> Result<bool, DomainError> {
        let mut entries = self.write()?;

        let removed = match entries.get_mut(key) {
            Some(StoredValue::Set(set)) => set.remove(member),
            Some(_) => return Err(wrong_type()),
            None => false,
        };

        Self::remove_if_empty(&mut entries, key);
        Ok(removed)
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>, DomainError> {
        match self.read()?.get(key) {
            Some(StoredValue::Set(set)) => Ok(set.iter().cloned().collect()),
            Some(_) => Err(wrong_type()),
            None => Ok(Vec::new()),
        }
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<(), DomainError> {
        let mut entries = self.write()?;

        let entry = entries
            .entry(key.to_string())
            .or_insert_with(|| StoredValue::Hash(HashMap::new()));

        match entry {
            StoredValue::Hash(hash) => {
                hash.insert(field.to_string(), value.to_string());
                Ok(())
            }
            _ => Err(wrong_type()),
        }
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>, DomainError> {
        match self.read()?.get(key) {
            Some(StoredValue::Hash(hash)) => Ok(hash.get(field).cloned()),
            Some(_) => Err(wrong_type()),
            None => Ok(None),
        }
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>, DomainError> {
        match self.read()?.get(key) {
            Some(StoredValue::Hash(hash)) => Ok(hash.clone()),
            Some(_) => Err(wrong_type()),
            None => Ok(HashMap::new()),
        }
    }

    async fn hdel(&self, key: &str, field: &str) -> Result<bool, DomainError> {
        let mut entries = self.write()?;

        let removed = match entries.get_mut(key) {
            Some(StoredValue::Hash(hash)) => hash.remove(field).is_some(),
            Some(_) => return Err(wrong_type()),
            None => false,
        };

        Self::remove_if_empty(&mut entries, key);
        Ok(removed)
    }

    async fn hincrby(&self, key: &str, field: &str, delta: i64) -> Result<i64, DomainError> {
        let mut entries = self.write()?;

        let entry = entries
            .entry(key.to_string())
            .or_insert_with(|| StoredValue::Hash(HashMap::new()));

        let StoredValue::Hash(hash) = entry else {
            return Err(wrong_type());
        };

        let current = match hash.get(field) {
            Some(value) => value
                .parse::<i64>()
                .map_err(|_| DomainError::storage(NOT_AN_INTEGER))?,
            None => 0,
        };

        let new_value = current
            .checked_add(delta)
            .ok_or_else(|| DomainError::storage(NOT_AN_INTEGER))?;
        hash.insert(field.to_string(), new_value.to_string());

        Ok(new_value)
    }
}
