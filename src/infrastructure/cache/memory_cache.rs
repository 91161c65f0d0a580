//! In-process cache.
//!
//! Implements [`Cache`] over `DashMap`s for single-instance deployments
//! without Redis. Expired entries are dropped lazily when read.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{de::DeserializeOwned, Serialize};

use super::Cache;
use crate::shared::error::AppError;

#[derive(Debug)]
struct Expiring<T> {
    value: T,
    expires_at: Instant,
}

impl<T> Expiring<T> {
    fn new(value: T, seconds: u64) -> Self {
        Self {
            value,
            expires_at: Instant::now() + Duration::from_secs(seconds),
        }
    }

    fn is_live(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

#[derive(Debug, Default)]
pub struct MemoryCache {
    values: DashMap<String, Expiring<String>>,
    sets: DashMap<String, Expiring<HashSet<String>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>, AppError> {
        self.values.remove_if(key, |_, entry| !entry.is_live());
        let Some(entry) = self.values.get(key) else {
            return Ok(None);
        };
        serde_json::from_str(&entry.value)
            .map(Some)
            .map_err(|e| AppError::Internal(format!("Cache deserialization failed: {}", e)))
    }

    async fn set_ex<T: Serialize + Sync + Send>(
        &self,
        key: &str,
        value: &T,
        seconds: u64,
    ) -> Result<(), AppError> {
        let data = serde_json::to_string(value)
            .map_err(|e| AppError::Internal(format!("Cache serialization failed: {}", e)))?;
        self.values
            .insert(key.to_string(), Expiring::new(data, seconds));
        Ok(())
    }

    async fn delete_many(&self, keys: &[String]) -> Result<u64, AppError> {
        let removed = keys
            .iter()
            .filter(|key| {
                let value = self.values.remove(key.as_str()).is_some();
                let set = self.sets.remove(key.as_str()).is_some();
                value || set
            })
            .count();
        Ok(removed as u64)
    }

    async fn add_to_set(&self, key: &str, member: &str, seconds: u64) -> Result<(), AppError> {
        let mut entry = self
            .sets
            .entry(key.to_string())
            .or_insert_with(|| Expiring::new(HashSet::new(), seconds));
        if !entry.is_live() {
            entry.value.clear();
        }
        entry.value.insert(member.to_string());
        entry.expires_at = Instant::now() + Duration::from_secs(seconds);
        Ok(())
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>, AppError> {
        self.sets.remove_if(key, |_, entry| !entry.is_live());
        Ok(self
            .sets
            .get(key)
            .map(|entry| entry.value.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}
