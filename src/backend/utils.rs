#[cfg(test)]
#[path = "utils_test.rs"]
mod tests;

use crate::config::constants::{REASONING_END, REASONING_START};

/// Remove every `<think>...</think>` segment and trim what is left. A start
/// marker that is never closed swallows the rest of the text.
pub fn strip_reasoning(text: &str) -> String {
    let mut ret = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find(REASONING_START) {
        ret.push_str(&rest[..start]);
        let after_start = &rest[start + REASONING_START.len()..];
        match after_start.find(REASONING_END) {
            Some(end) => rest = &after_start[end + REASONING_END.len()..],
            None => {
                rest = "";
                break;
            }
        }
    }
    ret.push_str(rest);

    ret.trim().to_string()
}
