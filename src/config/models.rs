use eyre::Result;
use serde::{Deserialize, Serialize};

use crate::models::Settings;

#[allow(unused_imports)]
use super::CONFIG;

use super::constants::{DEFAULT_TEMPERATURE, STORAGE_DIR};
use super::defaults::*;

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct Configuration {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub log: LogConfig,

    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct GeneralConfig {
    #[serde(default)]
    pub verbose: bool,

    #[serde(default)]
    pub default_model: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct LogConfig {
    #[serde(default = "log_level")]
    pub level: Option<String>,

    #[serde(default)]
    pub filters: Option<Vec<LogFilter>>,

    /// Log to stderr when unset.
    #[serde(default)]
    pub file: Option<LogFile>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct LogFilter {
    #[serde(default)]
    pub module: Option<String>,

    #[serde(default)]
    pub level: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct LogFile {
    pub path: String,

    #[serde(default)]
    pub append: bool,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct BackendConfig {
    #[serde(default = "endpoint")]
    pub endpoint: String,

    #[serde(default)]
    pub timeout_secs: Option<u16>,

    #[serde(default = "title_keep_alive")]
    pub title_keep_alive: String,

    #[serde(default = "default_true")]
    pub auto_title: bool,
}

/// Settings a fresh session starts with.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SessionConfig {
    #[serde(default)]
    pub system: String,

    #[serde(default = "temperature")]
    pub temperature: f64,

    #[serde(default)]
    pub seed: String,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub enum StorageConfig {
    #[serde(rename = "file")]
    File(FileStorage),
    #[serde(rename = "memory")]
    Memory,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct FileStorage {
    pub path: Option<String>,
}

impl Configuration {
    #[cfg(not(test))]
    pub fn instance() -> &'static Configuration {
        CONFIG.get_or_init(Configuration::default)
    }

    #[cfg(not(test))]
    pub fn init(config: Configuration) -> Result<()> {
        CONFIG
            .set(config)
            .map_err(|_| eyre::eyre!("Config already initialized"))?;
        Ok(())
    }

    #[cfg(test)]
    pub fn instance() -> &'static Configuration {
        use super::TEST_CONFIG;
        TEST_CONFIG.with(|config| *config.borrow())
    }

    #[cfg(test)]
    pub fn init(config: Configuration) -> Result<()> {
        use super::TEST_CONFIG;
        TEST_CONFIG.with(|test_config| {
            *test_config.borrow_mut() = Box::leak(Box::new(config));
        });
        Ok(())
    }
}

impl SessionConfig {
    pub fn settings(&self) -> Settings {
        Settings {
            system: self.system.clone(),
            temperature: self.temperature,
            seed: self.seed.clone(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: log_level(),
            filters: None,
            file: None,
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            endpoint: endpoint(),
            timeout_secs: None,
            title_keep_alive: title_keep_alive(),
            auto_title: true,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            system: String::new(),
            temperature: DEFAULT_TEMPERATURE,
            seed: String::new(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::File(FileStorage::default())
    }
}

impl FileStorage {
    pub fn path(&self) -> &str {
        self.path.as_deref().unwrap_or(STORAGE_DIR)
    }
}
