//! Row encoding for both sheet layouts.

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use goalbuddy_core::config::{RowLayout, Zone};
use goalbuddy_core::state::UserState;

/// Persisted timestamp format, wall-clock time in the configured zone.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const IDENTIFIED_HEADER: [&str; 10] = [
    "user_id",
    "username",
    "full_name",
    "goal_text",
    "goal_date",
    "progress_day2",
    "progress_date",
    "final_percent",
    "final_date",
    "state",
];

pub const ANONYMOUS_HEADER: [&str; 4] = ["goal_text", "goal_date", "final_percent", "final_date"];

/// 1-based column positions, identified layout.
pub(crate) mod identified {
    pub const USER_ID: usize = 1;
    pub const PROGRESS: usize = 6;
    pub const FINAL: usize = 8;
    pub const STATE: usize = 10;
}

/// 1-based column positions, anonymous layout.
pub(crate) mod anonymous {
    pub const FINAL: usize = 3;
}

/// How to find a participant's row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKey {
    /// Telegram user id (identified layout).
    User(i64),
    /// Sheet row number (anonymous layout).
    Row(usize),
}

/// One participant's persisted goal, progress, and assessment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    /// 1-based sheet row.
    pub row: usize,
    /// `None` in the anonymous layout.
    pub user_id: Option<i64>,
    pub username: String,
    pub full_name: String,
    pub goal_text: String,
    pub goal_timestamp: Option<DateTime<FixedOffset>>,
    /// Progress display label.
    pub progress: Option<String>,
    pub progress_timestamp: Option<DateTime<FixedOffset>>,
    pub final_score: Option<u8>,
    pub final_timestamp: Option<DateTime<FixedOffset>>,
    pub state: UserState,
}

impl UserRecord {
    pub fn has_goal(&self) -> bool {
        !self.goal_text.trim().is_empty()
    }
}

pub fn header(layout: RowLayout) -> Vec<String> {
    let cells: &[&str] = match layout {
        RowLayout::Identified => &IDENTIFIED_HEADER,
        RowLayout::Anonymous => &ANONYMOUS_HEADER,
    };
    cells.iter().map(|c| c.to_string()).collect()
}

pub fn format_timestamp(ts: &DateTime<FixedOffset>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a persisted timestamp as wall-clock time in `zone`.
pub fn parse_timestamp(s: &str, zone: Zone) -> Option<DateTime<FixedOffset>> {
    let naive = NaiveDateTime::parse_from_str(s.trim(), TIMESTAMP_FORMAT).ok()?;
    zone.resolve(&naive)
}

/// Decode a data row. Returns `None` for the header and for rows that do
/// not hold a record (no user id, or nothing at all). Missing trailing
/// cells read as empty.
pub fn decode_row(
    layout: RowLayout,
    row: usize,
    cells: &[String],
    zone: Zone,
) -> Option<UserRecord> {
    let cell = |i: usize| cells.get(i).map(|c| c.trim()).unwrap_or("");
    let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());

    let record = match layout {
        RowLayout::Identified => {
            let user_id = cell(0).parse::<i64>().ok()?;
            UserRecord {
                row,
                user_id: Some(user_id),
                username: cell(1).to_string(),
                full_name: cell(2).to_string(),
                goal_text: cell(3).to_string(),
                goal_timestamp: parse_timestamp(cell(4), zone),
                progress: non_empty(cell(5)),
                progress_timestamp: parse_timestamp(cell(6), zone),
                final_score: parse_score(cell(7)),
                final_timestamp: parse_timestamp(cell(8), zone),
                state: UserState::Idle,
            }
        }
        RowLayout::Anonymous => {
            if row == 1 && cell(0) == ANONYMOUS_HEADER[0] {
                return None;
            }
            if cells.iter().all(|c| c.trim().is_empty()) {
                return None;
            }
            UserRecord {
                row,
                user_id: None,
                username: String::new(),
                full_name: String::new(),
                goal_text: cell(0).to_string(),
                goal_timestamp: parse_timestamp(cell(1), zone),
                progress: None,
                progress_timestamp: None,
                final_score: parse_score(cell(2)),
                final_timestamp: parse_timestamp(cell(3), zone),
                state: UserState::Idle,
            }
        }
    };

    let state = match layout {
        RowLayout::Identified => UserState::parse(cell(9)),
        RowLayout::Anonymous => None,
    }
    .unwrap_or_else(|| infer_state(&record));

    Some(UserRecord { state, ..record })
}

/// Best guess for rows without a readable state column.
fn infer_state(record: &UserRecord) -> UserState {
    if record.final_score.is_some() {
        UserState::Completed
    } else if record.progress.is_some() {
        UserState::ProgressRecorded
    } else if record.has_goal() {
        UserState::GoalSet
    } else {
        UserState::Idle
    }
}

/// Scores come back as whatever the sheet displays, e.g. "85" or "85.0".
fn parse_score(s: &str) -> Option<u8> {
    if s.is_empty() {
        return None;
    }
    let value: f64 = s.trim_end_matches('%').parse().ok()?;
    (0.0..=100.0)
        .contains(&value)
        .then(|| value.round() as u8)
}
