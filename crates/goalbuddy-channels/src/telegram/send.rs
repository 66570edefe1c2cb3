//! Message sending: text with inline keyboards, edits, callback answers,
//! and command registration.

use super::TelegramChannel;
use goalbuddy_core::{error::GoalError, message::InlineKeyboard};
use serde_json::{json, Value};
use tracing::{info, warn};

impl TelegramChannel {
    /// Send a text message to a specific chat, optionally with an inline keyboard.
    pub(crate) async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<(), GoalError> {
        let mut body = json!({
            "chat_id": chat_id,
            "text": text,
        });
        if let Some(kb) = keyboard {
            body["reply_markup"] = reply_markup(kb);
        }
        self.post_markdown("sendMessage", body).await
    }

    /// Replace the text of a message the bot sent earlier (drops its keyboard).
    pub(crate) async fn edit_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
    ) -> Result<(), GoalError> {
        let body = json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "text": text,
        });
        self.post_markdown("editMessageText", body).await
    }

    /// Acknowledge a callback query.
    pub(crate) async fn answer_callback_query(&self, callback_id: &str) -> Result<(), GoalError> {
        let url = format!("{}/answerCallbackQuery", self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(&json!({ "callback_query_id": callback_id }))
            .send()
            .await
            .map_err(|e| {
                GoalError::Channel(format!("telegram answerCallbackQuery failed: {e}"))
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let error_text = resp.text().await.unwrap_or_default();
            return Err(GoalError::Channel(format!(
                "telegram answerCallbackQuery failed ({status}): {error_text}"
            )));
        }
        Ok(())
    }

    /// POST with Markdown parse mode, retrying once as plain text when
    /// Telegram rejects the entities.
    async fn post_markdown(&self, method: &str, mut body: Value) -> Result<(), GoalError> {
        let url = format!("{}/{method}", self.base_url);
        body["parse_mode"] = json!("Markdown");

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| GoalError::Channel(format!("telegram {method} failed: {e}")))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }

        let error_text = resp.text().await.unwrap_or_default();
        if !error_text.contains("can't parse entities") {
            return Err(GoalError::Channel(format!(
                "telegram {method} failed ({status}): {error_text}"
            )));
        }

        warn!("Markdown parse failed, retrying as plain text: {error_text}");
        if let Some(obj) = body.as_object_mut() {
            obj.remove("parse_mode");
        }
        let plain_resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| GoalError::Channel(format!("telegram {method} (plain) failed: {e}")))?;
        if !plain_resp.status().is_success() {
            let plain_err = plain_resp.text().await.unwrap_or_default();
            return Err(GoalError::Channel(format!(
                "telegram {method} (plain fallback) failed: {plain_err}"
            )));
        }
        Ok(())
    }

    /// Register bot commands with Telegram so users see an autocomplete menu.
    /// Best-effort: logs failures but does not propagate errors.
    pub(crate) async fn register_commands(&self) {
        let commands = json!({
            "commands": [
                { "command": "start", "description": "Start over and set a goal" },
                { "command": "assess", "description": "Rate your progress (0-100%)" },
            ]
        });

        let url = format!("{}/setMyCommands", self.base_url);
        match self.client.post(&url).json(&commands).send().await {
            Ok(resp) if resp.status().is_success() => {
                info!("registered Telegram bot commands");
            }
            Ok(resp) => {
                let body = resp.text().await.unwrap_or_default();
                warn!("failed to register Telegram bot commands: {body}");
            }
            Err(e) => {
                warn!("failed to register Telegram bot commands: {e}");
            }
        }
    }
}

/// Bot API `InlineKeyboardMarkup` JSON.
pub(crate) fn reply_markup(keyboard: &InlineKeyboard) -> Value {
    let rows: Vec<Vec<Value>> = keyboard
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|b| json!({ "text": b.text, "callback_data": b.callback_data }))
                .collect()
        })
        .collect();
    json!({ "inline_keyboard": rows })
}
