use super::constants::*;

pub(crate) fn log_level() -> Option<String> {
    Some("warn".to_string())
}

pub(crate) fn endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

pub(crate) fn title_keep_alive() -> String {
    TITLE_KEEP_ALIVE.to_string()
}

pub(crate) fn temperature() -> f64 {
    DEFAULT_TEMPERATURE
}

pub(crate) fn default_true() -> bool {
    true
}
