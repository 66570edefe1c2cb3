//! Tests for the persistence adapter, run against `MemorySheet`.

use super::*;
use crate::memory::MemorySheet;
use std::time::Duration;

fn zone() -> Zone {
    Zone::Fixed(chrono::FixedOffset::east_opt(3 * 3600).unwrap())
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_retries: 3,
        base_delay: Duration::from_millis(1),
    }
}

fn store(sheet: &Arc<MemorySheet>, layout: RowLayout) -> Store {
    Store::new(sheet.clone(), layout, zone(), fast_retry())
}

fn sender(id: i64) -> Sender {
    Sender {
        id,
        username: Some(format!("user{id}")),
        first_name: "Anna".into(),
        last_name: Some("K".into()),
    }
}

fn strings(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|c| c.to_string()).collect()
}

#[tokio::test]
async fn test_prepare_writes_header_once() {
    let sheet = Arc::new(MemorySheet::new());
    let store = store(&sheet, RowLayout::Identified);
    store.prepare().await.unwrap();
    store.prepare().await.unwrap();

    let rows = sheet.rows().await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0], header(RowLayout::Identified));
}

#[tokio::test]
async fn test_save_goal_appends_then_rewrites() {
    let sheet = Arc::new(MemorySheet::new());
    let store = store(&sheet, RowLayout::Identified);
    store.prepare().await.unwrap();

    let row = store
        .save_goal(&sender(42), "Finish the quarterly report draft")
        .await
        .unwrap();
    assert_eq!(row, 2);

    store
        .update_progress(RecordKey::User(42), ProgressChoice::OnTrack)
        .await
        .unwrap();

    // A second goal reuses the row and clears progress.
    let again = store
        .save_goal(&sender(42), "Read two chapters of the Rust book")
        .await
        .unwrap();
    assert_eq!(again, 2);

    let record = store.get_record(RecordKey::User(42)).await.unwrap().unwrap();
    assert_eq!(record.goal_text, "Read two chapters of the Rust book");
    assert_eq!(record.username, "user42");
    assert_eq!(record.full_name, "Anna K");
    assert_eq!(record.progress, None);
    assert_eq!(record.state, UserState::GoalSet);
    assert!(record.goal_timestamp.is_some());
    assert_eq!(sheet.rows().await.len(), 2);
}

#[tokio::test]
async fn test_save_goal_sanitizes_text() {
    let sheet = Arc::new(MemorySheet::new());
    let store = store(&sheet, RowLayout::Identified);

    store
        .save_goal(&sender(1), "=HYPERLINK(\"http://x\")\u{7} now")
        .await
        .unwrap();

    let rows = sheet.rows().await;
    assert_eq!(rows[0][3], "'=HYPERLINK(\"http://x\") now");
}

#[tokio::test]
async fn test_get_record_missing() {
    let sheet = Arc::new(MemorySheet::new());
    let store = store(&sheet, RowLayout::Identified);
    store.prepare().await.unwrap();
    assert!(store.get_record(RecordKey::User(9)).await.unwrap().is_none());
    assert!(store.get_record(RecordKey::Row(0)).await.unwrap().is_none());
    assert!(store.get_record(RecordKey::Row(50)).await.unwrap().is_none());
}

#[tokio::test]
async fn test_update_progress_keeps_assessment() {
    let sheet = Arc::new(MemorySheet::with_rows(vec![
        header(RowLayout::Identified),
        strings(&[
            "42",
            "anna",
            "Anna",
            "Finish the report",
            "2026-03-01 09:30:00",
            "",
            "",
            "90",
            "2026-03-04 09:30:00",
            "COMPLETED",
        ]),
    ]));
    let store = store(&sheet, RowLayout::Identified);

    store
        .update_progress(RecordKey::User(42), ProgressChoice::Difficulties)
        .await
        .unwrap();

    let record = store.get_record(RecordKey::User(42)).await.unwrap().unwrap();
    assert_eq!(record.progress.as_deref(), Some("Having difficulties"));
    assert!(record.progress_timestamp.is_some());
    assert_eq!(record.final_score, Some(90));
    assert_eq!(sheet.rows().await[1][8], "2026-03-04 09:30:00");
    assert_eq!(record.state, UserState::ProgressRecorded);
}

#[tokio::test]
async fn test_update_progress_leaves_assessment_cells_verbatim() {
    let sheet = Arc::new(MemorySheet::with_rows(vec![
        header(RowLayout::Identified),
        strings(&[
            "42",
            "anna",
            "Anna",
            "Finish the report",
            "2026-03-01 09:30:00",
            "",
            "",
            "85.5",
            "last week",
            "COMPLETED",
        ]),
    ]));
    let store = store(&sheet, RowLayout::Identified);

    store
        .update_progress(RecordKey::User(42), ProgressChoice::OnTrack)
        .await
        .unwrap();

    let rows = sheet.rows().await;
    assert_eq!(rows[1][5], "On track");
    assert_eq!(rows[1][7], "85.5");
    assert_eq!(rows[1][8], "last week");
    assert_eq!(rows[1][9], "PROGRESS_RECORDED");
}

#[tokio::test]
async fn test_save_state_rewrites_state_column_only() {
    let sheet = Arc::new(MemorySheet::new());
    let store = store(&sheet, RowLayout::Identified);
    store.prepare().await.unwrap();
    store
        .save_goal(&sender(42), "Finish the quarterly report draft")
        .await
        .unwrap();

    assert!(store
        .save_state(RecordKey::User(42), UserState::AwaitingGoal)
        .await
        .unwrap());
    let record = store.get_record(RecordKey::User(42)).await.unwrap().unwrap();
    assert_eq!(record.state, UserState::AwaitingGoal);
    assert_eq!(record.goal_text, "Finish the quarterly report draft");
    assert!(store
        .list_by_state(UserState::GoalSet)
        .await
        .unwrap()
        .is_empty());

    // Unchanged state: no write.
    let writes = sheet.writes();
    store
        .save_state(RecordKey::User(42), UserState::AwaitingGoal)
        .await
        .unwrap();
    assert_eq!(sheet.writes(), writes);

    // Nothing to update for unknown users.
    assert!(!store
        .save_state(RecordKey::User(7), UserState::AwaitingGoal)
        .await
        .unwrap());
    assert_eq!(sheet.writes(), writes);
}

#[tokio::test]
async fn test_save_state_anonymous_is_noop() {
    let sheet = Arc::new(MemorySheet::new());
    let store = store(&sheet, RowLayout::Anonymous);
    let row = store
        .save_goal(&sender(1), "Walk ten thousand steps")
        .await
        .unwrap();
    let writes = sheet.writes();
    assert!(!store
        .save_state(RecordKey::Row(row), UserState::AwaitingGoal)
        .await
        .unwrap());
    assert_eq!(sheet.writes(), writes);
}

#[tokio::test]
async fn test_named_zone_timestamps() {
    let sheet = Arc::new(MemorySheet::new());
    let store = Store::new(
        sheet.clone(),
        RowLayout::Identified,
        Zone::parse("Europe/Moscow").unwrap(),
        fast_retry(),
    );
    store
        .save_goal(&sender(42), "Finish the quarterly report draft")
        .await
        .unwrap();

    let record = store.get_record(RecordKey::User(42)).await.unwrap().unwrap();
    let saved = record.goal_timestamp.unwrap();
    assert_eq!(saved.offset().local_minus_utc(), 3 * 3600);
    let age = chrono::Utc::now() - saved.with_timezone(&chrono::Utc);
    assert!(age >= chrono::Duration::zero() && age < chrono::Duration::minutes(1));
}

#[tokio::test]
async fn test_update_progress_without_record_fails() {
    let sheet = Arc::new(MemorySheet::new());
    let store = store(&sheet, RowLayout::Identified);
    let err = store
        .update_progress(RecordKey::User(7), ProgressChoice::NotStarted)
        .await
        .unwrap_err();
    assert!(matches!(err, GoalError::Storage(_)));
    assert_eq!(sheet.writes(), 0);
}

#[tokio::test]
async fn test_save_assessment_identified() {
    let sheet = Arc::new(MemorySheet::new());
    let store = store(&sheet, RowLayout::Identified);
    store.prepare().await.unwrap();
    store
        .save_goal(&sender(42), "Finish the quarterly report draft")
        .await
        .unwrap();

    store
        .save_assessment(RecordKey::User(42), 85)
        .await
        .unwrap();

    let record = store.get_record(RecordKey::User(42)).await.unwrap().unwrap();
    assert_eq!(record.final_score, Some(85));
    assert!(record.final_timestamp.is_some());
    assert_eq!(record.state, UserState::Completed);
    assert_eq!(sheet.rows().await[1][9], "COMPLETED");
}

#[tokio::test]
async fn test_anonymous_layout() {
    let sheet = Arc::new(MemorySheet::new());
    let store = store(&sheet, RowLayout::Anonymous);
    store.prepare().await.unwrap();

    let first = store
        .save_goal(&sender(1), "Walk ten thousand steps")
        .await
        .unwrap();
    let second = store
        .save_goal(&sender(1), "Walk twelve thousand steps")
        .await
        .unwrap();
    assert_eq!((first, second), (2, 3));

    // No identity column: lookups by user id find nothing.
    assert!(store.get_record(RecordKey::User(1)).await.unwrap().is_none());

    let writes = sheet.writes();
    store
        .update_progress(RecordKey::Row(second), ProgressChoice::OnTrack)
        .await
        .unwrap();
    assert_eq!(sheet.writes(), writes);

    store
        .save_assessment(RecordKey::Row(second), 60)
        .await
        .unwrap();
    let rows = sheet.rows().await;
    assert_eq!(rows[0], header(RowLayout::Anonymous));
    assert_eq!(rows[2][0], "Walk twelve thousand steps");
    assert_eq!(rows[2][2], "60");
    assert_eq!(rows[1].get(2).map(String::as_str), Some(""));

    let record = store.get_record(RecordKey::Row(3)).await.unwrap().unwrap();
    assert_eq!(record.state, UserState::Completed);
}

#[tokio::test]
async fn test_list_by_state() {
    let sheet = Arc::new(MemorySheet::with_rows(vec![
        header(RowLayout::Identified),
        strings(&["1", "a", "A", "Goal number one", "2026-03-01 09:00:00", "", "", "", "", "GOAL_SET"]),
        strings(&["2", "b", "B", "Goal number two", "2026-03-01 09:00:00", "On track", "", "", "", "PROGRESS_RECORDED"]),
        strings(&["3", "c", "C", "Goal number three", "2026-03-01 10:00:00", "", "", "", "", "GOAL_SET"]),
    ]));
    let store = store(&sheet, RowLayout::Identified);

    let pending = store.list_by_state(UserState::GoalSet).await.unwrap();
    let ids: Vec<_> = pending.iter().map(|r| r.user_id).collect();
    assert_eq!(ids, vec![Some(1), Some(3)]);
    assert_eq!(store.list_records().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_rate_limits_are_retried() {
    let sheet = Arc::new(MemorySheet::new());
    let store = store(&sheet, RowLayout::Anonymous);
    sheet.inject_rate_limits(3);

    let row = store
        .save_goal(&sender(1), "Stretch every evening")
        .await
        .unwrap();
    assert_eq!(row, 1);
    assert_eq!(sheet.calls(), 4);
}

#[tokio::test]
async fn test_rate_limit_budget_exhausted() {
    let sheet = Arc::new(MemorySheet::new());
    let store = store(&sheet, RowLayout::Anonymous);
    sheet.inject_rate_limits(4);

    let err = store
        .save_goal(&sender(1), "Stretch every evening")
        .await
        .unwrap_err();
    assert!(err.is_rate_limited());
    assert!(sheet.rows().await.is_empty());
}

#[tokio::test]
async fn test_storage_failure_is_not_retried() {
    let sheet = Arc::new(MemorySheet::new());
    let store = store(&sheet, RowLayout::Identified);
    sheet.inject_failures(1);

    assert!(store
        .save_goal(&sender(1), "Stretch every evening")
        .await
        .is_err());
    assert_eq!(sheet.calls(), 1);
    assert_eq!(sheet.writes(), 0);
}
