use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::storage::Storage;

/// In-memory cache store for gate and extractor tests.
#[derive(Default)]
pub struct MemoryStore {
    pub records: Mutex<HashMap<String, String>>,
    pub fail: bool,
}

impl MemoryStore {
    pub fn failing() -> Self {
        Self { fail: true, ..Default::default() }
    }
}

#[async_trait]
impl Storage for MemoryStore {
    async fn get_cache(&self, key: &str, _now: i64) -> Result<Option<String>> {
        if self.fail {
            return Err(anyhow!("store offline"));
        }
        Ok(self.records.lock().unwrap().get(key).cloned())
    }

    async fn put_cache(&self, key: &str, payload: &str, _expires_at: i64) -> Result<()> {
        if self.fail {
            return Err(anyhow!("store offline"));
        }
        self.records.lock().unwrap().insert(key.to_string(), payload.to_string());
        Ok(())
    }
}
