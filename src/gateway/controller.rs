//! Conversation controller: the per-participant state machine.
//!
//! Every handler validates first, persists second, updates the session third
//! and only then builds the reply. A persistence error returns early, so the
//! session never advances past what the sheet holds.

use super::keyboards::progress_keyboard;
use super::scheduler::{ReminderDue, ReminderScheduler};
use crate::i18n::{self, t};
use goalbuddy_core::{
    config::RowLayout,
    error::GoalError,
    message::{IncomingMessage, MessageKind, OutgoingMessage, Sender},
    sanitize::strip_control_chars,
    state::{ProgressChoice, UserState},
    traits::{Session, StateStore},
    validate::{validate_goal_text, validate_score, GoalRejection},
};
use goalbuddy_sheets::{RecordKey, Store};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub struct Controller {
    store: Arc<Store>,
    sessions: Arc<dyn StateStore>,
    scheduler: ReminderScheduler,
    reminder_delay: Duration,
    lang: String,
}

impl Controller {
    pub fn new(
        store: Arc<Store>,
        sessions: Arc<dyn StateStore>,
        scheduler: ReminderScheduler,
        reminder_delay: Duration,
        lang: impl Into<String>,
    ) -> Self {
        Self {
            store,
            sessions,
            scheduler,
            reminder_delay,
            lang: lang.into(),
        }
    }

    /// Handle one incoming event. `Ok(None)` means the event is ignored in
    /// the current state.
    pub async fn handle(
        &self,
        incoming: &IncomingMessage,
    ) -> Result<Option<OutgoingMessage>, GoalError> {
        let sender = &incoming.sender;
        let target = incoming.reply_target;
        match &incoming.kind {
            MessageKind::Command { name, .. } => match name.as_str() {
                "start" => self.start(sender, target).await.map(Some),
                "assess" => self.assess(sender, target).await.map(Some),
                other => {
                    debug!("ignoring unknown command /{other} from {}", sender.id);
                    Ok(None)
                }
            },
            MessageKind::Text(text) => self.text(sender, target, text).await,
            MessageKind::Callback {
                data, message_id, ..
            } => match ProgressChoice::from_callback_data(data) {
                Some(choice) => self
                    .progress(sender, target, choice, *message_id)
                    .await
                    .map(Some),
                None => {
                    debug!("ignoring unknown callback '{data}' from {}", sender.id);
                    Ok(None)
                }
            },
        }
    }

    /// The reminder message for a due job.
    pub fn reminder_message(&self, due: &ReminderDue) -> OutgoingMessage {
        OutgoingMessage {
            text: i18n::reminder(&self.lang, &due.username, &due.goal_text),
            reply_target: due.chat_id,
            keyboard: Some(progress_keyboard(&self.lang)),
            edit_message_id: None,
        }
    }

    /// A reminder reached the participant: now waiting for a progress answer.
    pub async fn reminder_delivered(&self, identity: i64) {
        let session = self.sessions.get(identity).await;
        if session.state == UserState::GoalSet {
            self.sessions
                .set_state(identity, UserState::AwaitingProgress)
                .await;
        }
    }

    fn text_reply(&self, target: i64, text: impl Into<String>) -> OutgoingMessage {
        OutgoingMessage::text(target, text)
    }

    /// Where this participant's record lives, if anywhere.
    fn record_key(&self, identity: i64, session: &Session) -> Option<RecordKey> {
        match self.store.layout() {
            RowLayout::Identified => Some(RecordKey::User(identity)),
            RowLayout::Anonymous => session.row.map(RecordKey::Row),
        }
    }

    async fn start(&self, sender: &Sender, target: i64) -> Result<OutgoingMessage, GoalError> {
        info!("user {} ({}) started", sender.id, sender.display_name());
        // Persist the reset so recovery does not revive an abandoned goal.
        let session = self.sessions.get(sender.id).await;
        if let Some(key) = self.record_key(sender.id, &session) {
            self.store.save_state(key, UserState::AwaitingGoal).await?;
        }
        self.scheduler.cancel(sender.id).await;
        self.sessions.reset(sender.id, UserState::AwaitingGoal).await;
        Ok(self.text_reply(target, t("welcome", &self.lang)))
    }

    async fn assess(&self, sender: &Sender, target: i64) -> Result<OutgoingMessage, GoalError> {
        let session = self.sessions.get(sender.id).await;
        let record = match self.record_key(sender.id, &session) {
            Some(key) => self.store.get_record(key).await?,
            None => None,
        };

        match record {
            Some(record) if record.has_goal() => {
                self.sessions
                    .set_state(sender.id, UserState::AwaitingAssessment)
                    .await;
                info!("user {} asked to assess", sender.id);
                Ok(self.text_reply(
                    target,
                    i18n::assessment_request(&self.lang, &record.goal_text),
                ))
            }
            _ => Ok(self.text_reply(target, t("no_goal", &self.lang))),
        }
    }

    async fn text(
        &self,
        sender: &Sender,
        target: i64,
        text: &str,
    ) -> Result<Option<OutgoingMessage>, GoalError> {
        let session = self.sessions.get(sender.id).await;
        match session.state {
            UserState::AwaitingGoal => self.goal(sender, target, text).await.map(Some),
            UserState::AwaitingAssessment => {
                self.assessment(sender, target, &session, text).await.map(Some)
            }
            state => {
                debug!("ignoring text from {} in state {state}", sender.id);
                Ok(None)
            }
        }
    }

    async fn goal(
        &self,
        sender: &Sender,
        target: i64,
        text: &str,
    ) -> Result<OutgoingMessage, GoalError> {
        let cleaned = strip_control_chars(text);
        let goal = match validate_goal_text(&cleaned) {
            Ok(goal) => goal,
            Err(GoalRejection::TooShort) => {
                return Ok(self.text_reply(target, t("goal_too_short", &self.lang)))
            }
            Err(GoalRejection::TooLong) => {
                return Ok(self.text_reply(target, t("goal_too_long", &self.lang)))
            }
        };

        let row = self.store.save_goal(sender, goal).await?;
        self.sessions.set_row(sender.id, row).await;
        self.sessions.set_state(sender.id, UserState::GoalSet).await;

        let job = ReminderDue {
            identity: sender.id,
            chat_id: target,
            username: sender.display_name().to_string(),
            goal_text: goal.to_string(),
        };
        self.scheduler.schedule(job, self.reminder_delay).await;

        Ok(self.text_reply(target, i18n::goal_confirmation(&self.lang, goal)))
    }

    async fn assessment(
        &self,
        sender: &Sender,
        target: i64,
        session: &Session,
        text: &str,
    ) -> Result<OutgoingMessage, GoalError> {
        let Some(score) = validate_score(text) else {
            return Ok(self.text_reply(target, t("invalid_assessment", &self.lang)));
        };
        let Some(key) = self.record_key(sender.id, session) else {
            return Ok(self.text_reply(target, t("no_goal", &self.lang)));
        };

        self.store.save_assessment(key, score).await?;
        self.sessions
            .set_state(sender.id, UserState::Completed)
            .await;
        Ok(self.text_reply(target, i18n::assessment_thanks(&self.lang, score)))
    }

    async fn progress(
        &self,
        sender: &Sender,
        target: i64,
        choice: ProgressChoice,
        message_id: Option<i64>,
    ) -> Result<OutgoingMessage, GoalError> {
        let session = self.sessions.get(sender.id).await;
        if let Some(key) = self.record_key(sender.id, &session) {
            self.store.update_progress(key, choice).await?;
        }
        self.scheduler.cancel(sender.id).await;
        self.sessions
            .set_state(sender.id, UserState::ProgressRecorded)
            .await;
        info!("user {} reported progress {choice:?}", sender.id);

        // Replace the reminder (and its keyboard) with the answer.
        Ok(OutgoingMessage {
            text: i18n::progress_response(&self.lang, choice).to_string(),
            reply_target: target,
            keyboard: None,
            edit_message_id: message_id,
        })
    }
}
