#[cfg(test)]
#[path = "store_test.rs"]
mod tests;

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

use crate::models::{Conversation, Message, SettingsUpdate};
use crate::storage::Persistence;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("no conversation is current")]
    NoCurrentConversation,
    #[error("conversation {0} not found")]
    NotFound(String),
}

pub type SharedStore = Arc<Mutex<ConversationStore>>;

/// Ordered collection of conversations plus the current selection. Every
/// operation that changes the collection writes the whole of it back through
/// the persistence adapter before returning.
pub struct ConversationStore {
    conversations: Vec<Conversation>,
    current_id: Option<String>,
    persistence: Persistence,
}

impl ConversationStore {
    pub fn open(persistence: Persistence) -> Self {
        let mut seen = HashSet::new();
        let conversations = persistence
            .load()
            .into_iter()
            .filter(|convo| {
                let fresh = seen.insert(convo.id().to_string());
                if !fresh {
                    log::warn!("Dropping stored duplicate of conversation {}", convo.id());
                }
                fresh
            })
            .collect::<Vec<_>>();
        log::debug!("Loaded {} conversations", conversations.len());

        Self {
            conversations,
            current_id: None,
            persistence,
        }
    }

    pub fn into_shared(self) -> SharedStore {
        Arc::new(Mutex::new(self))
    }

    /// Make an empty conversation current and return its id. The first empty
    /// conversation in the collection is reused; otherwise a new one is
    /// prepended.
    pub fn create(&mut self) -> String {
        let id = match self.conversations.iter_mut().find(|c| c.is_empty()) {
            Some(convo) => {
                convo.refresh();
                convo.id().to_string()
            }
            None => {
                let convo = Conversation::new();
                let id = convo.id().to_string();
                self.conversations.insert(0, convo);
                id
            }
        };
        self.current_id = Some(id.clone());
        self.persist();
        id
    }

    pub fn set_current(&mut self, id: &str) -> Result<(), StoreError> {
        if self.get(id).is_none() {
            return Err(StoreError::NotFound(id.to_string()));
        }
        self.current_id = Some(id.to_string());
        Ok(())
    }

    pub fn current_id(&self) -> Option<&str> {
        self.current_id.as_deref()
    }

    pub fn current(&self) -> Option<&Conversation> {
        self.current_id.as_deref().and_then(|id| self.get(id))
    }

    pub fn get(&self, id: &str) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id() == id)
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn append_message(&mut self, message: Message) -> Result<(), StoreError> {
        let id = self.require_current()?;
        self.append_message_to(&id, message)
    }

    pub fn append_message_to(&mut self, id: &str, message: Message) -> Result<(), StoreError> {
        self.get_mut(id)?.append_message(message);
        self.persist();
        Ok(())
    }

    /// Returns `Ok(false)` without touching anything when the last message of
    /// the current conversation is not an assistant reply.
    pub fn append_to_last_assistant_message(&mut self, fragment: &str) -> Result<bool, StoreError> {
        let id = self.require_current()?;
        self.append_to_last_assistant_message_in(&id, fragment)
    }

    pub fn append_to_last_assistant_message_in(
        &mut self,
        id: &str,
        fragment: &str,
    ) -> Result<bool, StoreError> {
        if !self.get_mut(id)?.append_to_last_assistant(fragment) {
            return Ok(false);
        }
        self.persist();
        Ok(true)
    }

    pub fn update_settings(&mut self, update: SettingsUpdate) -> Result<(), StoreError> {
        let id = self.require_current()?;
        self.get_mut(&id)?.apply_settings(update);
        self.persist();
        Ok(())
    }

    pub fn rename(&mut self, id: &str, title: &str) -> Result<(), StoreError> {
        self.get_mut(id)?.set_title(title);
        self.persist();
        Ok(())
    }

    pub fn delete(&mut self, id: &str) -> Result<(), StoreError> {
        let idx = self
            .conversations
            .iter()
            .position(|c| c.id() == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        self.conversations.remove(idx);
        if self.current_id.as_deref() == Some(id) {
            self.current_id = None;
        }
        self.persist();
        Ok(())
    }

    pub fn clear(&mut self) {
        self.conversations.clear();
        self.current_id = None;
        self.persist();
    }

    fn require_current(&self) -> Result<String, StoreError> {
        self.current_id
            .clone()
            .ok_or(StoreError::NoCurrentConversation)
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut Conversation, StoreError> {
        self.conversations
            .iter_mut()
            .find(|c| c.id() == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn persist(&self) {
        if let Err(err) = self.persistence.save(&self.conversations) {
            log::error!("Failed to persist conversations: {:?}", err);
        }
    }
}
