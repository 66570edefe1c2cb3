use crate::{
    error::GoalError,
    message::{IncomingMessage, OutgoingMessage},
    state::UserState,
};
use async_trait::async_trait;

/// Messaging Channel trait.
///
/// Every messaging platform implements this trait to receive events and
/// send replies.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Human-readable channel name.
    fn name(&self) -> &str;

    /// Start listening for incoming events.
    /// Returns a receiver that yields incoming messages.
    async fn start(&self) -> Result<tokio::sync::mpsc::Receiver<IncomingMessage>, GoalError>;

    /// Send a message, or edit an existing one when `edit_message_id` is set.
    async fn send(&self, message: OutgoingMessage) -> Result<(), GoalError>;

    /// Acknowledge a button press so the client stops its spinner.
    async fn answer_callback(&self, _callback_id: &str) -> Result<(), GoalError> {
        Ok(())
    }

    /// Graceful shutdown.
    async fn stop(&self) -> Result<(), GoalError>;
}

/// Per-participant conversation cache.
///
/// The persisted sheet is the source of truth; this only remembers where a
/// participant currently is, plus the anonymous row handle when the sheet
/// carries no identity column.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Current session, `Session::default()` (IDLE) when unknown.
    async fn get(&self, identity: i64) -> Session;

    async fn set_state(&self, identity: i64, state: UserState);

    async fn set_row(&self, identity: i64, row: usize);

    /// Forget everything about `identity`, then put it in `state`.
    async fn reset(&self, identity: i64, state: UserState);
}

/// Cached conversation position for one participant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Session {
    pub state: UserState,
    /// Sheet row holding this participant's goal (anonymous layout).
    pub row: Option<usize>,
}
