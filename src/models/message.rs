use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::now;

/// Creator tag carried by every message typed by the user.
pub const USER_CREATOR: &str = "user";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    content: String,
    role: Role,
    creator: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    updated_at: DateTime<Utc>,
}

impl Message {
    pub fn new_user(content: impl Into<String>) -> Self {
        Self::new(Role::User, USER_CREATOR, content)
    }

    /// An assistant message starts empty and grows as fragments arrive.
    pub fn new_assistant(model: impl Into<String>) -> Self {
        Self::new(Role::Assistant, model, "")
    }

    fn new(role: Role, creator: impl Into<String>, content: impl Into<String>) -> Self {
        let timestamp = now();
        Self {
            content: content.into(),
            role,
            creator: creator.into(),
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn append(&mut self, text: &str) {
        self.content.push_str(text);
        self.updated_at = now().max(self.updated_at);
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn creator(&self) -> &str {
        &self.creator
    }

    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
