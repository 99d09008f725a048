use std::collections::HashMap;

use eyre::Result;
use parking_lot::Mutex;

use super::BlobStore;

#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, String>>,
}

impl MemoryBlobStore {
    pub fn with_blob(key: impl Into<String>, value: impl Into<String>) -> Self {
        let store = Self::default();
        store.blobs.lock().insert(key.into(), value.into());
        store
    }
}

impl BlobStore for MemoryBlobStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.blobs.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.blobs.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}
