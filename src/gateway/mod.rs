//! Gateway: the event loop connecting the channel, the controller, and the
//! reminder queue.
//!
//! Events for the same participant are processed one at a time; events from
//! different participants run concurrently.

mod controller;
mod keyboards;
mod recovery;
mod scheduler;

pub use controller::Controller;
pub use recovery::{recover, RecoveryReport};
pub use scheduler::{ReminderDue, ReminderScheduler};

use crate::i18n::t;
use goalbuddy_core::{
    message::{IncomingMessage, MessageKind, OutgoingMessage},
    traits::Channel,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{error, info, warn};

/// Work for one participant.
#[derive(Debug, Clone)]
enum Event {
    Incoming(IncomingMessage),
    Reminder(ReminderDue),
}

impl Event {
    fn identity(&self) -> i64 {
        match self {
            Self::Incoming(msg) => msg.sender.id,
            Self::Reminder(due) => due.identity,
        }
    }
}

/// Routes channel events and due reminders through the controller.
pub struct Gateway {
    channel: Arc<dyn Channel>,
    controller: Arc<Controller>,
    scheduler: ReminderScheduler,
    lang: String,
    /// Participants with an event in progress. Later events are buffered here.
    active_senders: Mutex<HashMap<i64, Vec<Event>>>,
}

impl Gateway {
    pub fn new(
        channel: Arc<dyn Channel>,
        controller: Arc<Controller>,
        scheduler: ReminderScheduler,
        lang: impl Into<String>,
    ) -> Self {
        Self {
            channel,
            controller,
            scheduler,
            lang: lang.into(),
            active_senders: Mutex::new(HashMap::new()),
        }
    }

    /// Run the main event loop until ctrl-c.
    pub async fn run(
        self: Arc<Self>,
        mut reminders: mpsc::Receiver<ReminderDue>,
    ) -> anyhow::Result<()> {
        let mut incoming = self
            .channel
            .start()
            .await
            .map_err(|e| anyhow::anyhow!("failed to start channel {}: {e}", self.channel.name()))?;
        info!("GoalBuddy gateway running | channel: {}", self.channel.name());

        loop {
            tokio::select! {
                Some(msg) = incoming.recv() => {
                    let gw = self.clone();
                    tokio::spawn(async move {
                        gw.dispatch(Event::Incoming(msg)).await;
                    });
                }
                Some(due) = reminders.recv() => {
                    let gw = self.clone();
                    tokio::spawn(async move {
                        gw.dispatch(Event::Reminder(due)).await;
                    });
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    break;
                }
            }
        }

        self.shutdown().await;
        Ok(())
    }

    /// Dispatch an event: buffer if the participant is busy, otherwise process.
    async fn dispatch(self: Arc<Self>, event: Event) {
        let key = event.identity();

        {
            let mut active = self.active_senders.lock().await;
            if let Some(buffer) = active.get_mut(&key) {
                buffer.push(event);
                info!("buffered event for {key} (event in progress)");
                return;
            }
            active.insert(key, Vec::new());
        }

        self.process(event).await;

        // Drain any buffered events for this participant.
        loop {
            let next = {
                let mut active = self.active_senders.lock().await;
                match active.get_mut(&key) {
                    Some(buf) if !buf.is_empty() => Some(buf.remove(0)),
                    _ => {
                        active.remove(&key);
                        None
                    }
                }
            };

            match next {
                Some(buffered) => {
                    info!("processing buffered event for {key}");
                    self.process(buffered).await;
                }
                None => break,
            }
        }
    }

    async fn process(&self, event: Event) {
        match event {
            Event::Incoming(msg) => self.handle_message(msg).await,
            Event::Reminder(due) => self.deliver_reminder(due).await,
        }
    }

    async fn handle_message(&self, incoming: IncomingMessage) {
        if let MessageKind::Callback { id, .. } = &incoming.kind {
            if let Err(e) = self.channel.answer_callback(id).await {
                warn!("failed to answer callback {id}: {e}");
            }
        }

        // Run on its own task so a panic is contained and reported.
        let controller = self.controller.clone();
        let msg = incoming.clone();
        let outcome = tokio::spawn(async move { controller.handle(&msg).await }).await;

        match outcome {
            Ok(Ok(Some(reply))) => self.send(reply).await,
            Ok(Ok(None)) => {}
            Ok(Err(e)) => {
                error!("failed to handle event from {}: {e}", incoming.sender.id);
                self.send_error(&incoming).await;
            }
            Err(e) => {
                error!("handler for {} panicked: {e}", incoming.sender.id);
                self.send_error(&incoming).await;
            }
        }
    }

    /// Send a due reminder. Delivery failures are logged and not retried.
    async fn deliver_reminder(&self, due: ReminderDue) {
        let msg = self.controller.reminder_message(&due);
        match self.channel.send(msg).await {
            Ok(()) => {
                info!("sent day-2 reminder to {}", due.identity);
                self.controller.reminder_delivered(due.identity).await;
            }
            Err(e) => error!("failed to send reminder to {}: {e}", due.identity),
        }
    }

    async fn send(&self, msg: OutgoingMessage) {
        let Err(e) = self.channel.send(msg.clone()).await else {
            return;
        };
        if msg.edit_message_id.is_none() {
            error!("failed to send message: {e}");
            return;
        }
        // The original message may be gone; answer with a new one instead.
        warn!("edit failed, sending as new message: {e}");
        let fresh = OutgoingMessage {
            edit_message_id: None,
            ..msg
        };
        if let Err(e) = self.channel.send(fresh).await {
            error!("failed to send message: {e}");
        }
    }

    async fn send_error(&self, incoming: &IncomingMessage) {
        self.send(OutgoingMessage::text(
            incoming.reply_target,
            t("generic_error", &self.lang),
        ))
        .await;
    }

    async fn shutdown(&self) {
        info!("Shutting down...");
        self.scheduler.shutdown().await;
        if let Err(e) = self.channel.stop().await {
            warn!("failed to stop channel {}: {e}", self.channel.name());
        }
        info!("Shutdown complete.");
    }
}
