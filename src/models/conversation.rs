#[cfg(test)]
#[path = "conversation_test.rs"]
mod tests;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::constants::{DEFAULT_TEMPERATURE, NEW_CONVERSATION_TITLE};
use crate::models::{Message, now};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    id: String,
    title: String,
    messages: Vec<Message>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    updated_at: DateTime<Utc>,
    #[serde(default)]
    system: String,
    #[serde(default = "default_temperature")]
    temperature: f64,
    #[serde(default)]
    seed: String,
}

/// Generation settings carried by a conversation and mirrored by the session
/// while the conversation is current.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub system: String,
    pub temperature: f64,
    pub seed: String,
}

/// Partial settings merged into a conversation; `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsUpdate {
    pub system: Option<String>,
    pub temperature: Option<f64>,
    pub seed: Option<String>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = messages;
        self
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.touch();
    }

    /// Reset both timestamps, used when an empty conversation is handed out
    /// again instead of allocating a new one.
    pub fn refresh(&mut self) {
        let timestamp = now();
        self.created_at = timestamp;
        self.updated_at = timestamp;
    }

    pub fn append_message(&mut self, message: Message) {
        self.messages.push(message);
        self.touch();
    }

    /// Append `text` to the last message when it was written by the
    /// assistant. Returns false and leaves everything untouched otherwise.
    pub fn append_to_last_assistant(&mut self, text: &str) -> bool {
        match self.messages.last_mut() {
            Some(last) if last.is_assistant() => last.append(text),
            _ => return false,
        }
        self.touch();
        true
    }

    pub fn apply_settings(&mut self, update: SettingsUpdate) {
        if let Some(system) = update.system {
            self.system = system;
        }
        if let Some(temperature) = update.temperature {
            self.temperature = temperature;
        }
        if let Some(seed) = update.seed {
            self.seed = seed;
        }
        self.touch();
    }

    pub fn settings(&self) -> Settings {
        Settings {
            system: self.system.clone(),
            temperature: self.temperature,
            seed: self.seed.clone(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn system(&self) -> &str {
        &self.system
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn touch(&mut self) {
        self.updated_at = now().max(self.updated_at);
    }
}

impl Default for Conversation {
    fn default() -> Self {
        let timestamp = now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: NEW_CONVERSATION_TITLE.to_string(),
            messages: vec![],
            created_at: timestamp,
            updated_at: timestamp,
            system: String::new(),
            temperature: DEFAULT_TEMPERATURE,
            seed: String::new(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            system: String::new(),
            temperature: DEFAULT_TEMPERATURE,
            seed: String::new(),
        }
    }
}

impl SettingsUpdate {
    pub fn system(system: impl Into<String>) -> Self {
        Self {
            system: Some(system.into()),
            ..Default::default()
        }
    }

    pub fn temperature(temperature: f64) -> Self {
        Self {
            temperature: Some(temperature),
            ..Default::default()
        }
    }

    pub fn seed(seed: impl Into<String>) -> Self {
        Self {
            seed: Some(seed.into()),
            ..Default::default()
        }
    }
}

impl From<&Settings> for SettingsUpdate {
    fn from(settings: &Settings) -> Self {
        Self {
            system: Some(settings.system.clone()),
            temperature: Some(settings.temperature),
            seed: Some(settings.seed.clone()),
        }
    }
}

fn default_temperature() -> f64 {
    DEFAULT_TEMPERATURE
}
