use std::sync::Arc;

use tokio::sync::mpsc;

/// Notifications published by the session for whoever renders it.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    LoadingChanged(bool),
    Fragment {
        conversation_id: String,
        text: String,
    },
    ConversationRenamed {
        id: String,
        title: String,
    },
    CompletionFailed {
        conversation_id: String,
        reason: String,
    },
}

#[async_trait::async_trait]
pub trait EventTx {
    async fn send(&self, event: Event) -> Result<(), mpsc::error::SendError<Event>>;
}

#[async_trait::async_trait]
impl EventTx for mpsc::UnboundedSender<Event> {
    async fn send(&self, event: Event) -> Result<(), mpsc::error::SendError<Event>> {
        self.send(event)
    }
}

pub type ArcEventTx = Arc<dyn EventTx + Send + Sync>;
