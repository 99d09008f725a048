pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

pub const DEFAULT_TEMPERATURE: f64 = 0.7;

pub const NEW_CONVERSATION_TITLE: &str = "New Conversation";

/// Key under which the whole conversation collection is stored.
pub const STORAGE_KEY: &str = "completion-conversations";

pub const STORAGE_DIR: &str = "${HOME}/.local/share/parley";

/// Unload the model right after the one-off title request.
pub const TITLE_KEEP_ALIVE: &str = "0m";

pub const TITLE_SYSTEM_PROMPT: &str = "You are a naming assistant. Given a system prompt that describes a tool or AI assistant, generate a short, clear, and creative name that reflects the tool's purpose. The name must be between 2 to 4 words, relevant to the described function. Respond only with the name. Do not include any explanation or extra text. now name this assistance for following prompt as system input:";

pub const REASONING_START: &str = "<think>";
pub const REASONING_END: &str = "</think>";
