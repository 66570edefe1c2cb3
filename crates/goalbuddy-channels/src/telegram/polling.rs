//! Long-polling update loop and Channel trait implementation.

use super::types::{TgResponse, TgUpdate, TgUser};
use super::TelegramChannel;
use async_trait::async_trait;
use goalbuddy_core::{
    error::GoalError,
    message::{IncomingMessage, MessageKind, OutgoingMessage, Sender},
    traits::Channel,
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn start(&self) -> Result<mpsc::Receiver<IncomingMessage>, GoalError> {
        self.register_commands().await;

        let (tx, rx) = mpsc::channel(64);
        let client = self.client.clone();
        let base_url = self.base_url.clone();
        let allowed_users = self.config.allowed_users.clone();
        let last_update_id = self.last_update_id.clone();

        info!("Telegram channel starting long polling...");

        tokio::spawn(async move {
            let mut backoff_secs: u64 = 1;

            loop {
                let last = last_update_id.lock().await;
                let offset = last.map(|id| id + 1);
                drop(last);

                let mut url = format!(
                    "{base_url}/getUpdates?timeout=30&allowed_updates=[\"message\",\"callback_query\"]"
                );
                if let Some(off) = offset {
                    url.push_str(&format!("&offset={off}"));
                }

                let resp = match client
                    .get(&url)
                    .timeout(std::time::Duration::from_secs(35))
                    .send()
                    .await
                {
                    Ok(r) => r,
                    Err(e) => {
                        error!("telegram poll error (retry in {backoff_secs}s): {e}");
                        tokio::time::sleep(std::time::Duration::from_secs(backoff_secs)).await;
                        backoff_secs = (backoff_secs * 2).min(60);
                        continue;
                    }
                };

                let body: TgResponse<Vec<TgUpdate>> = match resp.json().await {
                    Ok(b) => b,
                    Err(e) => {
                        error!("telegram parse error (retry in {backoff_secs}s): {e}");
                        tokio::time::sleep(std::time::Duration::from_secs(backoff_secs)).await;
                        backoff_secs = (backoff_secs * 2).min(60);
                        continue;
                    }
                };

                if !body.ok {
                    error!(
                        "telegram API error (retry in {backoff_secs}s): {}",
                        body.description.unwrap_or_default()
                    );
                    tokio::time::sleep(std::time::Duration::from_secs(backoff_secs)).await;
                    backoff_secs = (backoff_secs * 2).min(60);
                    continue;
                }

                // Successful poll -- reset backoff.
                backoff_secs = 1;

                let updates = body.result.unwrap_or_default();

                if let Some(last_update) = updates.last() {
                    *last_update_id.lock().await = Some(last_update.update_id);
                }

                for update in updates {
                    let Some(incoming) = convert_update(update, &allowed_users) else {
                        continue;
                    };

                    if tx.send(incoming).await.is_err() {
                        info!("telegram channel receiver dropped, stopping poll");
                        return;
                    }
                }
            }
        });

        Ok(rx)
    }

    async fn send(&self, message: OutgoingMessage) -> Result<(), GoalError> {
        match message.edit_message_id {
            Some(message_id) => {
                self.edit_text(message.reply_target, message_id, &message.text)
                    .await
            }
            None => {
                self.send_text(
                    message.reply_target,
                    &message.text,
                    message.keyboard.as_ref(),
                )
                .await
            }
        }
    }

    async fn answer_callback(&self, callback_id: &str) -> Result<(), GoalError> {
        self.answer_callback_query(callback_id).await
    }

    async fn stop(&self) -> Result<(), GoalError> {
        info!("Telegram channel stopped");
        Ok(())
    }
}

/// Turn a raw update into an incoming event, or `None` when it should be
/// ignored (unsupported content, unauthorized sender, group chat).
pub(crate) fn convert_update(update: TgUpdate, allowed_users: &[i64]) -> Option<IncomingMessage> {
    let (user, chat_id, kind) = if let Some(msg) = update.message {
        let user = msg.from?;
        // Drop group messages -- the exercise is one-on-one.
        if msg.chat.is_group() {
            debug!("telegram: ignoring group message from chat {}", msg.chat.id);
            return None;
        }
        let text = msg.text?;
        (user, msg.chat.id, parse_text(&text))
    } else if let Some(query) = update.callback_query {
        let chat_id = query
            .message
            .as_ref()
            .map(|m| m.chat.id)
            .unwrap_or(query.from.id);
        let kind = MessageKind::Callback {
            id: query.id,
            data: query.data.unwrap_or_default(),
            message_id: query.message.map(|m| m.message_id),
        };
        (query.from, chat_id, kind)
    } else {
        return None;
    };

    // Auth check.
    if !allowed_users.is_empty() && !allowed_users.contains(&user.id) {
        warn!("ignoring update from unauthorized user {}", user.id);
        return None;
    }

    Some(IncomingMessage {
        id: Uuid::new_v4(),
        channel: "telegram".to_string(),
        sender: to_sender(user),
        kind,
        timestamp: chrono::Utc::now(),
        reply_target: chat_id,
    })
}

/// Split `/cmd@bot args` into a command, anything else is plain text.
pub(crate) fn parse_text(text: &str) -> MessageKind {
    let trimmed = text.trim_start();
    if let Some(rest) = trimmed.strip_prefix('/') {
        let (head, args) = match rest.split_once(char::is_whitespace) {
            Some((h, a)) => (h, a.trim()),
            None => (rest, ""),
        };
        // Strip @botname suffix (e.g. "/start@goal_bot" -> "start").
        let name = head.split('@').next().unwrap_or(head);
        if !name.is_empty() {
            return MessageKind::Command {
                name: name.to_lowercase(),
                args: args.to_string(),
            };
        }
    }
    MessageKind::Text(text.to_string())
}

fn to_sender(user: TgUser) -> Sender {
    Sender {
        id: user.id,
        username: user.username,
        first_name: user.first_name,
        last_name: user.last_name,
    }
}
