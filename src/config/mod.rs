pub mod constants;
pub(crate) mod defaults;
pub mod models;
pub mod utils;

pub use models::{
    BackendConfig, Configuration, FileStorage, GeneralConfig, LogConfig, LogFile, LogFilter,
    SessionConfig, StorageConfig,
};
pub use utils::{basename, init_logger, load_configuration, lookup_config_path, resolve_path};

#[cfg(test)]
use std::cell::RefCell;

use std::sync::OnceLock;

pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const GIT_SHA: &str = match option_env!("GIT_SHA") {
    Some(v) => v,
    None => "unknown",
};

/// Sent with every request to the completion API.
pub fn user_agent() -> String {
    format!("{APP_NAME}/{VERSION}")
}

pub fn version() -> String {
    format!("{APP_NAME} {VERSION} (commit {GIT_SHA})")
}

/// Set once at start-up by `Configuration::init`.
#[cfg_attr(test, allow(dead_code))]
static CONFIG: OnceLock<Configuration> = OnceLock::new();

// Each test thread gets its own configuration so tests can override it.
#[cfg(test)]
thread_local! {
    static TEST_CONFIG: RefCell<&'static Configuration> =
        RefCell::new(Box::leak(Box::new(Configuration::default())));
}

/// Print start-up progress to stderr when `general.verbose` is on.
#[macro_export]
macro_rules! verbose {
    ($($arg:tt)*) => {
        if $crate::config::Configuration::instance().general.verbose {
            eprintln!($($arg)*);
        }
    };
}

pub use verbose;
