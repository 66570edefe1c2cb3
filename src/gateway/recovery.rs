//! Startup recovery: rebuild sessions and pending reminders from the sheet.
//!
//! Reminder jobs live only in memory, so after a restart every record still
//! in `GOAL_SET` gets its reminder recomputed from the persisted goal time.

use super::scheduler::{ReminderDue, ReminderScheduler};
use chrono::{DateTime, Utc};
use goalbuddy_core::{
    config::{OverduePolicy, RowLayout},
    error::GoalError,
    state::UserState,
    traits::StateStore,
};
use goalbuddy_sheets::Store;
use std::time::Duration;
use tracing::{info, warn};

/// What a recovery pass did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Sessions restored from the state column.
    pub sessions: usize,
    /// Reminders rescheduled for their original fire time.
    pub rescheduled: usize,
    /// Overdue reminders fired right away (`OverduePolicy::Fire`).
    pub fired: usize,
    /// Overdue reminders skipped (`OverduePolicy::Drop`).
    pub dropped: usize,
}

pub async fn recover(
    store: &Store,
    scheduler: &ReminderScheduler,
    sessions: &dyn StateStore,
    delay: Duration,
    overdue: OverduePolicy,
    now: DateTime<Utc>,
) -> Result<RecoveryReport, GoalError> {
    let mut report = RecoveryReport::default();

    if store.layout() == RowLayout::Anonymous {
        info!("anonymous layout: no identities to recover");
        return Ok(report);
    }

    let delay_chrono = chrono::Duration::from_std(delay)
        .map_err(|e| GoalError::Config(format!("reminder delay out of range: {e}")))?;

    for record in store.list_records().await? {
        let Some(identity) = record.user_id else {
            continue;
        };

        if record.state != UserState::Idle {
            sessions.set_state(identity, record.state).await;
            report.sessions += 1;
        }

        if record.state != UserState::GoalSet {
            continue;
        }
        let Some(goal_time) = record.goal_timestamp else {
            warn!("user {identity} is in GOAL_SET without a readable goal date, skipping");
            continue;
        };

        let fire_at = goal_time.with_timezone(&Utc) + delay_chrono;
        let remaining = match (fire_at - now).to_std() {
            Ok(left) if !left.is_zero() => {
                report.rescheduled += 1;
                left
            }
            _ => match overdue {
                OverduePolicy::Drop => {
                    info!("reminder for {identity} was due at {fire_at}, dropping");
                    report.dropped += 1;
                    continue;
                }
                OverduePolicy::Fire => {
                    report.fired += 1;
                    Duration::ZERO
                }
            },
        };

        let username = if record.username.is_empty() {
            record.full_name.clone()
        } else {
            record.username.clone()
        };
        let job = ReminderDue {
            identity,
            // Private chats share the user's id.
            chat_id: identity,
            username,
            goal_text: record.goal_text.clone(),
        };
        scheduler.schedule(job, remaining).await;
    }

    info!(
        "recovery: {} sessions, {} reminders rescheduled, {} fired, {} dropped",
        report.sessions, report.rescheduled, report.fired, report.dropped
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;
    use goalbuddy_core::config::Zone;
    use goalbuddy_core::session::MemoryStateStore;
    use goalbuddy_sheets::store::{format_timestamp, header};
    use goalbuddy_sheets::{MemorySheet, RetryPolicy};
    use std::sync::Arc;

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    fn offset() -> FixedOffset {
        FixedOffset::east_opt(3 * 3600).unwrap()
    }

    fn row(id: i64, goal_time: DateTime<Utc>, state: &str) -> Vec<String> {
        vec![
            id.to_string(),
            format!("user{id}"),
            "Some One".into(),
            format!("Goal of user {id}"),
            format_timestamp(&goal_time.with_timezone(&offset())),
            String::new(),
            String::new(),
            String::new(),
            String::new(),
            state.into(),
        ]
    }

    fn store(rows: Vec<Vec<String>>, layout: RowLayout) -> Store {
        Store::new(
            Arc::new(MemorySheet::with_rows(rows)),
            layout,
            Zone::Fixed(offset()),
            RetryPolicy::default(),
        )
    }

    /// Whole seconds, so the persisted timestamp round-trips exactly.
    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(Utc::now().timestamp(), 0).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_reschedules_future_and_drops_overdue() {
        let now = now();
        let store = store(
            vec![
                header(RowLayout::Identified),
                row(1, now - chrono::Duration::hours(23), "GOAL_SET"),
                row(2, now - chrono::Duration::hours(30), "GOAL_SET"),
                row(3, now - chrono::Duration::hours(2), "COMPLETED"),
            ],
            RowLayout::Identified,
        );
        let sessions = MemoryStateStore::new();
        let (scheduler, _rx) = ReminderScheduler::new(8);

        let report = recover(&store, &scheduler, &sessions, DAY, OverduePolicy::Drop, now)
            .await
            .unwrap();

        assert_eq!(report.rescheduled, 1);
        assert_eq!(report.dropped, 1);
        assert_eq!(report.fired, 0);
        assert_eq!(
            scheduler.time_until(1).await,
            Some(Duration::from_secs(60 * 60))
        );
        assert_eq!(scheduler.time_until(2).await, None);
        assert_eq!(scheduler.time_until(3).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fire_policy_delivers_overdue_now() {
        let now = now();
        let store = store(
            vec![
                header(RowLayout::Identified),
                row(2, now - chrono::Duration::hours(30), "GOAL_SET"),
            ],
            RowLayout::Identified,
        );
        let sessions = MemoryStateStore::new();
        let (scheduler, mut rx) = ReminderScheduler::new(8);

        let report = recover(&store, &scheduler, &sessions, DAY, OverduePolicy::Fire, now)
            .await
            .unwrap();
        assert_eq!(report.fired, 1);

        let due = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(due.identity, 2);
        assert_eq!(due.username, "user2");
        assert_eq!(due.goal_text, "Goal of user 2");
    }

    #[tokio::test]
    async fn test_rehydrates_sessions() {
        let now = now();
        let store = store(
            vec![
                header(RowLayout::Identified),
                row(1, now, "AWAITING_ASSESSMENT"),
                row(2, now, "COMPLETED"),
                row(3, now, "IDLE"),
            ],
            RowLayout::Identified,
        );
        let sessions = MemoryStateStore::new();
        let (scheduler, _rx) = ReminderScheduler::new(8);

        let report = recover(&store, &scheduler, &sessions, DAY, OverduePolicy::Drop, now)
            .await
            .unwrap();
        assert_eq!(report.sessions, 2);
        assert_eq!(sessions.get(1).await.state, UserState::AwaitingAssessment);
        assert_eq!(sessions.get(2).await.state, UserState::Completed);
        assert_eq!(scheduler.pending().await, 0);
    }

    #[tokio::test]
    async fn test_anonymous_layout_recovers_nothing() {
        let store = store(
            vec![
                header(RowLayout::Anonymous),
                vec!["Goal text here".into(), "2026-01-01 10:00:00".into()],
            ],
            RowLayout::Anonymous,
        );
        let sessions = MemoryStateStore::new();
        let (scheduler, _rx) = ReminderScheduler::new(8);

        let report = recover(&store, &scheduler, &sessions, DAY, OverduePolicy::Fire, now())
            .await
            .unwrap();
        assert_eq!(report, RecoveryReport::default());
        assert!(sessions.is_empty().await);
    }
}
