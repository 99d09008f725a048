#[cfg(test)]
#[path = "persistence_test.rs"]
mod tests;

use eyre::{Context, Result};

use super::ArcBlobStore;
use crate::models::Conversation;

/// Loads and saves the whole conversation collection as a single JSON blob.
#[derive(Clone)]
pub struct Persistence {
    blobs: ArcBlobStore,
    key: String,
}

impl Persistence {
    pub fn new(blobs: ArcBlobStore, key: impl Into<String>) -> Self {
        Self {
            blobs,
            key: key.into(),
        }
    }

    /// An absent or unreadable blob yields an empty collection.
    pub fn load(&self) -> Vec<Conversation> {
        let raw = match self.blobs.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                log::debug!("No stored conversations under {}", self.key);
                return vec![];
            }
            Err(err) => {
                log::warn!("Failed to read stored conversations: {:?}", err);
                return vec![];
            }
        };

        match serde_json::from_str::<Vec<Conversation>>(&raw) {
            Ok(conversations) => conversations,
            Err(err) => {
                log::warn!("Discarding malformed stored conversations: {}", err);
                vec![]
            }
        }
    }

    pub fn save(&self, conversations: &[Conversation]) -> Result<()> {
        let raw = serde_json::to_string(conversations).wrap_err("serializing conversations")?;
        self.blobs
            .set(&self.key, &raw)
            .wrap_err(format!("writing {}", self.key))?;
        Ok(())
    }
}
