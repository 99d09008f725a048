#[cfg(test)]
#[path = "session_test.rs"]
mod tests;

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::backend::ArcBackend;
use crate::config::constants::TITLE_KEEP_ALIVE;
use crate::models::{ArcEventTx, Conversation, Event, Settings, SettingsUpdate};

use super::store::{ConversationStore, SharedStore, StoreError};

/// Entry point for whatever drives the conversations: exposes the current
/// conversation, the editable settings and input, and `submit`.
///
/// Cloning is cheap and every clone shares the same state.
#[derive(Clone)]
pub struct Session {
    pub(super) store: SharedStore,
    pub(super) state: Arc<Mutex<SessionState>>,
    pub(super) backend: ArcBackend,
    pub(super) event_tx: Option<ArcEventTx>,
    pub(super) title: TitleOptions,
    pub(super) tasks: Arc<tokio::sync::Mutex<JoinSet<()>>>,
}

pub(super) struct SessionState {
    pub settings: Settings,
    pub input: String,
    pub loading: bool,
    pub cancel: Option<CancellationToken>,
}

#[derive(Debug, Clone)]
pub(super) struct TitleOptions {
    pub enabled: bool,
    pub keep_alive: String,
}

impl Session {
    pub fn new(store: ConversationStore, backend: ArcBackend) -> Self {
        Self {
            store: store.into_shared(),
            state: Arc::new(Mutex::new(SessionState {
                settings: Settings::default(),
                input: String::new(),
                loading: false,
                cancel: None,
            })),
            backend,
            event_tx: None,
            title: TitleOptions {
                enabled: true,
                keep_alive: TITLE_KEEP_ALIVE.to_string(),
            },
            tasks: Arc::new(tokio::sync::Mutex::new(JoinSet::new())),
        }
    }

    pub fn with_event_tx(mut self, event_tx: ArcEventTx) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    /// Settings used until a conversation is selected.
    pub fn with_settings(self, settings: Settings) -> Self {
        self.state.lock().settings = settings;
        self
    }

    pub fn with_auto_title(mut self, enabled: bool) -> Self {
        self.title.enabled = enabled;
        self
    }

    pub fn with_title_keep_alive(mut self, keep_alive: impl Into<String>) -> Self {
        self.title.keep_alive = keep_alive.into();
        self
    }

    pub fn current(&self) -> Option<Conversation> {
        self.store.lock().current().cloned()
    }

    pub fn current_id(&self) -> Option<String> {
        self.store.lock().current_id().map(String::from)
    }

    pub fn get(&self, id: &str) -> Option<Conversation> {
        self.store.lock().get(id).cloned()
    }

    pub fn conversations(&self) -> Vec<Conversation> {
        self.store.lock().conversations().to_vec()
    }

    /// Make an empty conversation current and take over its settings.
    pub fn new_conversation(&self) -> String {
        let (id, settings) = {
            let mut store = self.store.lock();
            let id = store.create();
            let settings = store.current().map(|c| c.settings()).unwrap_or_default();
            (id, settings)
        };
        self.state.lock().settings = settings;
        id
    }

    pub fn select(&self, id: &str) -> Result<(), StoreError> {
        let settings = {
            let mut store = self.store.lock();
            store.set_current(id)?;
            store.current().map(|c| c.settings()).unwrap_or_default()
        };
        self.state.lock().settings = settings;
        Ok(())
    }

    pub fn rename(&self, id: &str, title: &str) -> Result<(), StoreError> {
        self.store.lock().rename(id, title)
    }

    pub fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.store.lock().delete(id)
    }

    pub fn clear(&self) {
        self.store.lock().clear();
    }

    pub fn settings(&self) -> Settings {
        self.state.lock().settings.clone()
    }

    pub fn set_system(&self, system: impl Into<String>) {
        let system = system.into();
        {
            let mut state = self.state.lock();
            if state.settings.system == system {
                return;
            }
            state.settings.system = system.clone();
        }
        self.persist_settings(SettingsUpdate::system(system));
    }

    pub fn set_temperature(&self, temperature: f64) {
        {
            let mut state = self.state.lock();
            if state.settings.temperature == temperature {
                return;
            }
            state.settings.temperature = temperature;
        }
        self.persist_settings(SettingsUpdate::temperature(temperature));
    }

    pub fn set_seed(&self, seed: impl Into<String>) {
        let seed = seed.into();
        {
            let mut state = self.state.lock();
            if state.settings.seed == seed {
                return;
            }
            state.settings.seed = seed.clone();
        }
        self.persist_settings(SettingsUpdate::seed(seed));
    }

    pub fn input(&self) -> String {
        self.state.lock().input.clone()
    }

    pub fn set_input(&self, input: impl Into<String>) {
        self.state.lock().input = input.into();
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().loading
    }

    /// Settings only stick to a conversation while one is current.
    fn persist_settings(&self, update: SettingsUpdate) {
        let mut store = self.store.lock();
        if store.current_id().is_none() {
            return;
        }
        if let Err(err) = store.update_settings(update) {
            log::warn!("Failed to update conversation settings: {}", err);
        }
    }

    pub(super) async fn emit(&self, event: Event) {
        let Some(event_tx) = self.event_tx.as_ref() else {
            return;
        };
        event_tx.send(event).await.unwrap_or_else(|err| {
            log::debug!("Dropping session event: {}", err);
        });
    }
}
