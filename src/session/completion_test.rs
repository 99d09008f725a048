use super::*;

fn settings(system: &str, temperature: f64, seed: &str) -> Settings {
    Settings {
        system: system.to_string(),
        temperature,
        seed: seed.to_string(),
    }
}

#[test]
fn test_reply_request() {
    let request = reply_request("Hello", "llama3", &settings("Be brief.", 0.2, "42"));

    assert_eq!(request.model, "llama3");
    assert_eq!(request.prompt, "Hello");
    assert_eq!(request.system.as_deref(), Some("Be brief."));
    assert!(request.stream);
    assert!(request.keep_alive.is_none());
    assert_eq!(
        request.options,
        Some(GenerateOptions {
            temperature: Some(0.2),
            seed: Some(42),
        })
    );
}

#[test]
fn test_reply_request_always_sends_system() {
    let request = reply_request("Hello", "llama3", &Settings::default());
    assert_eq!(request.system.as_deref(), Some(""));
    let options = request.options.expect("no options");
    assert_eq!(options.temperature, Some(0.7));
    assert_eq!(options.seed, None);
}

#[test]
fn test_reply_request_skips_invalid_seed() {
    let request = reply_request("Hello", "llama3", &settings("", 0.5, "lucky"));
    let options = request.options.expect("no options");
    assert_eq!(options.seed, None);
    assert_eq!(options.temperature, Some(0.5));

    let request = reply_request("Hello", "llama3", &settings("", 0.5, " -7 "));
    assert_eq!(request.options.and_then(|o| o.seed), Some(-7));
}

#[test]
fn test_title_request_uses_system_prompt() {
    let request = title_request("What is 2+2?", "llama3", "You are a math tutor.", "0m");

    assert_eq!(request.model, "llama3");
    assert_eq!(request.prompt, "You are a math tutor.");
    assert_eq!(request.system.as_deref(), Some(TITLE_SYSTEM_PROMPT));
    assert!(!request.stream);
    assert_eq!(request.keep_alive.as_deref(), Some("0m"));
    assert!(request.options.is_none());
}

#[test]
fn test_title_request_falls_back_to_prompt() {
    let request = title_request("Plan a trip to Hue", "llama3", "  ", "5m");
    assert_eq!(request.prompt, "Plan a trip to Hue");
    assert_eq!(request.keep_alive.as_deref(), Some("5m"));
}
