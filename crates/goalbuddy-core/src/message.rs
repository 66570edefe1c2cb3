use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An incoming event from a channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub id: Uuid,
    /// Channel name (e.g. "telegram").
    pub channel: String,
    pub sender: Sender,
    pub kind: MessageKind,
    pub timestamp: DateTime<Utc>,
    /// Platform-specific target for routing the response (Telegram chat_id).
    pub reply_target: i64,
}

/// What the participant did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageKind {
    /// A `/command`, with the `@botname` suffix and leading slash removed.
    Command { name: String, args: String },
    /// Free text.
    Text(String),
    /// An inline button press.
    Callback {
        id: String,
        data: String,
        /// The message carrying the pressed keyboard, if still accessible.
        message_id: Option<i64>,
    },
}

/// The person behind an incoming event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sender {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: Option<String>,
}

impl Sender {
    /// Username when set, otherwise the first name.
    pub fn display_name(&self) -> &str {
        match self.username.as_deref() {
            Some(u) if !u.is_empty() => u,
            _ => &self.first_name,
        }
    }

    pub fn full_name(&self) -> String {
        match self.last_name.as_deref() {
            Some(last) if !last.is_empty() => format!("{} {last}", self.first_name),
            _ => self.first_name.clone(),
        }
    }
}

/// An outgoing message to send back through a channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub text: String,
    /// Telegram chat_id.
    pub reply_target: i64,
    #[serde(default)]
    pub keyboard: Option<InlineKeyboard>,
    /// When set, edit this existing message instead of sending a new one.
    #[serde(default)]
    pub edit_message_id: Option<i64>,
}

impl OutgoingMessage {
    pub fn text(reply_target: i64, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            reply_target,
            ..Default::default()
        }
    }
}

/// Inline keyboard: rows of buttons.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineKeyboard {
    pub rows: Vec<Vec<InlineButton>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineButton {
    pub text: String,
    pub callback_data: String,
}
