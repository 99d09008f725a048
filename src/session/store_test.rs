use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;
use crate::config::constants::{NEW_CONVERSATION_TITLE, STORAGE_KEY};
use crate::models::Role;
use crate::storage::{BlobStore, MemoryBlobStore};

/// Memory store that counts how many times the collection was written.
#[derive(Default)]
struct CountingBlobStore {
    inner: MemoryBlobStore,
    writes: AtomicUsize,
}

impl BlobStore for CountingBlobStore {
    fn get(&self, key: &str) -> eyre::Result<Option<String>> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> eyre::Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, value)
    }
}

impl CountingBlobStore {
    fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

fn open_store() -> (ConversationStore, Arc<CountingBlobStore>) {
    let blobs = Arc::new(CountingBlobStore::default());
    let store = ConversationStore::open(Persistence::new(blobs.clone(), STORAGE_KEY));
    (store, blobs)
}

fn reload(blobs: &Arc<CountingBlobStore>) -> ConversationStore {
    ConversationStore::open(Persistence::new(blobs.clone(), STORAGE_KEY))
}

#[test]
fn test_create_allocates_and_prepends() {
    let (mut store, blobs) = open_store();

    let first = store.create();
    assert_eq!(store.current_id(), Some(first.as_str()));
    assert_eq!(store.conversations().len(), 1);
    assert_eq!(store.current().map(|c| c.title()), Some(NEW_CONVERSATION_TITLE));

    store
        .append_message(Message::new_user("Hello"))
        .expect("failed to append");

    let second = store.create();
    assert_ne!(first, second);
    assert_eq!(store.conversations().len(), 2);
    assert_eq!(store.conversations()[0].id(), second);
    assert_eq!(store.conversations()[1].id(), first);
    assert_eq!(store.current_id(), Some(second.as_str()));
    assert_eq!(blobs.writes(), 3);
}

#[test]
fn test_create_reuses_first_empty_conversation() {
    let (mut store, _blobs) = open_store();

    let id = store.create();
    let created_at = store.current().map(|c| c.created_at()).expect("no current");

    std::thread::sleep(std::time::Duration::from_millis(5));
    let again = store.create();

    assert_eq!(id, again);
    assert_eq!(store.conversations().len(), 1);
    let convo = store.current().expect("no current");
    assert!(convo.created_at() > created_at);
    assert_eq!(convo.created_at(), convo.updated_at());
}

#[test]
fn test_create_reuses_empty_conversation_behind_others() {
    let (mut store, _blobs) = open_store();

    let empty = store.create();
    store.append_message(Message::new_user("a")).expect("append");
    let busy = store.create();
    assert_ne!(empty, busy);
    // Nothing is empty once `busy` has a message.
    store.append_message(Message::new_user("b")).expect("append");

    let fresh = store.create();
    assert_eq!(store.conversations().len(), 3);
    assert_eq!(store.conversations()[0].id(), fresh);

    store.set_current(&busy).expect("set current");
    assert_eq!(store.create(), fresh);
}

#[test]
fn test_get_current_none() {
    let (mut store, _blobs) = open_store();
    assert!(store.current().is_none());
    assert_eq!(
        store.set_current("missing"),
        Err(StoreError::NotFound("missing".to_string()))
    );
    assert!(store.current_id().is_none());
}

#[test]
fn test_append_message_without_current() {
    let (mut store, blobs) = open_store();

    assert_eq!(
        store.append_message(Message::new_user("Hello")),
        Err(StoreError::NoCurrentConversation)
    );
    assert_eq!(
        store.append_to_last_assistant_message("Hi"),
        Err(StoreError::NoCurrentConversation)
    );
    assert_eq!(
        store.update_settings(SettingsUpdate::system("terse")),
        Err(StoreError::NoCurrentConversation)
    );
    assert!(store.conversations().is_empty());
    assert_eq!(blobs.writes(), 0);
}

#[test]
fn test_messages_keep_append_order() {
    let (mut store, _blobs) = open_store();
    store.create();

    for (idx, text) in ["one", "two", "three", "four"].iter().enumerate() {
        let message = if idx % 2 == 0 {
            Message::new_user(*text)
        } else {
            Message::new_assistant("llama3").with_content(*text)
        };
        store.append_message(message).expect("failed to append");
    }
    store
        .append_to_last_assistant_message("!")
        .expect("failed to append fragment");

    let convo = store.current().expect("no current");
    let contents = convo
        .messages()
        .iter()
        .map(|m| m.content())
        .collect::<Vec<_>>();
    assert_eq!(contents, vec!["one", "two", "three", "four!"]);
}

#[test]
fn test_append_to_last_assistant_message_skips_user_message() {
    let (mut store, blobs) = open_store();
    store.create();
    store
        .append_message(Message::new_user("Hello"))
        .expect("failed to append");
    let writes = blobs.writes();
    let before = store.current().cloned().expect("no current");

    let appended = store
        .append_to_last_assistant_message(" world")
        .expect("failed to append");

    assert!(!appended);
    assert_eq!(store.current(), Some(&before));
    assert_eq!(blobs.writes(), writes);
}

#[test]
fn test_append_to_last_assistant_message() {
    let (mut store, blobs) = open_store();
    let id = store.create();
    store
        .append_message(Message::new_user("Hello"))
        .expect("failed to append");
    store
        .append_message(Message::new_assistant("llama3"))
        .expect("failed to append");

    assert_eq!(store.append_to_last_assistant_message("Hi"), Ok(true));
    assert_eq!(
        store.append_to_last_assistant_message_in(&id, " there"),
        Ok(true)
    );

    let convo = store.current().expect("no current");
    assert_eq!(convo.len(), 2);
    let last = convo.last_message().expect("no message");
    assert_eq!(last.role(), Role::Assistant);
    assert_eq!(last.content(), "Hi there");
    assert_eq!(last.creator(), "llama3");

    let stored = reload(&blobs);
    assert_eq!(stored.conversations(), store.conversations());
}

#[test]
fn test_update_settings() {
    let (mut store, blobs) = open_store();
    store.create();

    store
        .update_settings(SettingsUpdate::temperature(0.3))
        .expect("failed to update");
    store
        .update_settings(SettingsUpdate::seed("99"))
        .expect("failed to update");

    let convo = store.current().expect("no current");
    assert_eq!(convo.temperature(), 0.3);
    assert_eq!(convo.seed(), "99");
    assert_eq!(convo.system(), "");
    assert_eq!(blobs.writes(), 3);
}

#[test]
fn test_rename_is_independent_of_current() {
    let (mut store, _blobs) = open_store();
    let first = store.create();
    store.append_message(Message::new_user("a")).expect("append");
    let second = store.create();

    store.rename(&first, "Trip Planner").expect("failed to rename");

    assert_eq!(store.get(&first).map(|c| c.title()), Some("Trip Planner"));
    assert_eq!(
        store.get(&second).map(|c| c.title()),
        Some(NEW_CONVERSATION_TITLE)
    );
    assert_eq!(store.current_id(), Some(second.as_str()));
    assert_eq!(
        store.rename("missing", "x"),
        Err(StoreError::NotFound("missing".to_string()))
    );
}

#[test]
fn test_delete_current_clears_current() {
    let (mut store, blobs) = open_store();
    let first = store.create();
    store.append_message(Message::new_user("a")).expect("append");
    let second = store.create();

    store.delete(&second).expect("failed to delete");
    assert!(store.current_id().is_none());
    assert!(store.current().is_none());
    assert_eq!(store.conversations().len(), 1);

    store.set_current(&first).expect("set current");
    store.append_message(Message::new_user("b")).expect("append");
    let third = store.create();
    store.delete(&first).expect("failed to delete");
    assert_eq!(store.current_id(), Some(third.as_str()));

    assert_eq!(
        store.delete(&first),
        Err(StoreError::NotFound(first.clone()))
    );
    assert_eq!(reload(&blobs).conversations().len(), 1);
}

#[test]
fn test_clear() {
    let (mut store, blobs) = open_store();
    store.create();
    store.append_message(Message::new_user("a")).expect("append");
    store.create();

    store.clear();

    assert!(store.conversations().is_empty());
    assert!(store.current_id().is_none());
    assert!(reload(&blobs).conversations().is_empty());
}

#[test]
fn test_every_mutation_is_written() {
    let (mut store, blobs) = open_store();
    let id = store.create();
    assert_eq!(blobs.writes(), 1);
    store.append_message(Message::new_user("a")).expect("append");
    assert_eq!(blobs.writes(), 2);
    store
        .append_message(Message::new_assistant("m"))
        .expect("append");
    assert_eq!(blobs.writes(), 3);
    store.append_to_last_assistant_message("x").expect("append");
    assert_eq!(blobs.writes(), 4);
    store.rename(&id, "t").expect("rename");
    assert_eq!(blobs.writes(), 5);
    store.delete(&id).expect("delete");
    assert_eq!(blobs.writes(), 6);
    store.clear();
    assert_eq!(blobs.writes(), 7);
}

#[test]
fn test_open_drops_duplicate_ids() {
    let convo = Conversation::new().with_id("same").with_title("first");
    let duplicate = Conversation::new().with_id("same").with_title("second");
    let raw = serde_json::to_string(&vec![convo, duplicate]).expect("serialize");

    let blobs = Arc::new(MemoryBlobStore::with_blob(STORAGE_KEY, raw));
    let store = ConversationStore::open(Persistence::new(blobs, STORAGE_KEY));

    assert_eq!(store.conversations().len(), 1);
    assert_eq!(store.conversations()[0].title(), "first");
}

#[test]
fn test_open_malformed_blob_starts_clean() {
    let blobs = Arc::new(MemoryBlobStore::with_blob(STORAGE_KEY, "{oops"));
    let store = ConversationStore::open(Persistence::new(blobs, STORAGE_KEY));
    assert!(store.conversations().is_empty());
    assert!(store.current().is_none());
}
