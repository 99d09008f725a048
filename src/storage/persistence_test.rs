use std::sync::Arc;

use super::*;
use crate::models::Message;
use crate::storage::{BlobStore, MemoryBlobStore};

const KEY: &str = "completion-conversations";

fn persistence_with(blobs: Arc<MemoryBlobStore>) -> Persistence {
    Persistence::new(blobs, KEY)
}

#[test]
fn test_load_absent_blob() {
    let persistence = persistence_with(Arc::new(MemoryBlobStore::default()));
    assert!(persistence.load().is_empty());
}

#[test]
fn test_load_malformed_blob() {
    for raw in ["", "not json", "{\"id\": 1}", "[{\"title\": \"missing id\"}]"] {
        let persistence = persistence_with(Arc::new(MemoryBlobStore::with_blob(KEY, raw)));
        assert!(persistence.load().is_empty(), "blob {raw:?} should load empty");
    }
}

#[test]
fn test_round_trip() {
    let blobs = Arc::new(MemoryBlobStore::default());
    let persistence = persistence_with(blobs.clone());

    let mut answered = Conversation::new().with_title("Greeter");
    answered.append_message(Message::new_user("Hello"));
    answered.append_message(Message::new_assistant("llama3"));
    answered.append_to_last_assistant("Hi there");
    let conversations = vec![answered, Conversation::new()];

    persistence.save(&conversations).expect("failed to save");
    assert_eq!(persistence.load(), conversations);

    // Saving what was loaded leaves the blob unchanged.
    let before = blobs.get(KEY).expect("failed to read");
    persistence.save(&persistence.load()).expect("failed to save");
    assert_eq!(blobs.get(KEY).expect("failed to read"), before);
}

#[test]
fn test_round_trip_empty() {
    let blobs = Arc::new(MemoryBlobStore::default());
    let persistence = persistence_with(blobs.clone());

    persistence.save(&[]).expect("failed to save");
    assert_eq!(blobs.get(KEY).expect("failed to read").as_deref(), Some("[]"));
    assert!(persistence.load().is_empty());
}
