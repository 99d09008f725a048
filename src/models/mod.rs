pub mod backend;
pub mod conversation;
pub mod event;
pub mod message;

pub use backend::*;
pub use conversation::{Conversation, Settings, SettingsUpdate};
pub use event::{ArcEventTx, Event, EventTx};
pub use message::{Message, Role, USER_CREATOR};

use chrono::{DateTime, SubsecRound, Utc};

/// Current time at the millisecond precision the persisted blob keeps.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}
