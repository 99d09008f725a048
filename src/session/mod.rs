pub mod completion;
pub mod session;
pub mod store;

pub use completion::CompletionOutcome;
pub use session::Session;
pub use store::{ConversationStore, SharedStore, StoreError};
