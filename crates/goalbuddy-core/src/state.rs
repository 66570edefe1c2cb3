//! Conversation states and progress choices.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a participant is in the goal-setting journey.
///
/// `IDLE → AWAITING_GOAL → GOAL_SET → (AWAITING_PROGRESS →) PROGRESS_RECORDED
/// → AWAITING_ASSESSMENT → COMPLETED`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserState {
    #[default]
    Idle,
    AwaitingGoal,
    GoalSet,
    AwaitingProgress,
    ProgressRecorded,
    AwaitingAssessment,
    Completed,
}

impl UserState {
    /// The persisted column value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::AwaitingGoal => "AWAITING_GOAL",
            Self::GoalSet => "GOAL_SET",
            Self::AwaitingProgress => "AWAITING_PROGRESS",
            Self::ProgressRecorded => "PROGRESS_RECORDED",
            Self::AwaitingAssessment => "AWAITING_ASSESSMENT",
            Self::Completed => "COMPLETED",
        }
    }

    /// Parse a persisted column value. Unknown values yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "IDLE" => Some(Self::Idle),
            "AWAITING_GOAL" => Some(Self::AwaitingGoal),
            "GOAL_SET" => Some(Self::GoalSet),
            "AWAITING_PROGRESS" => Some(Self::AwaitingProgress),
            "PROGRESS_RECORDED" => Some(Self::ProgressRecorded),
            "AWAITING_ASSESSMENT" => Some(Self::AwaitingAssessment),
            "COMPLETED" => Some(Self::Completed),
            _ => None,
        }
    }
}

impl fmt::Display for UserState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three answers offered by the day-2 reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressChoice {
    OnTrack,
    Difficulties,
    NotStarted,
}

impl ProgressChoice {
    pub const ALL: [ProgressChoice; 3] = [Self::OnTrack, Self::Difficulties, Self::NotStarted];

    /// Inline button callback payload.
    pub fn callback_data(&self) -> &'static str {
        match self {
            Self::OnTrack => "on_track",
            Self::Difficulties => "difficulties",
            Self::NotStarted => "not_started",
        }
    }

    pub fn from_callback_data(data: &str) -> Option<Self> {
        match data {
            "on_track" => Some(Self::OnTrack),
            "difficulties" => Some(Self::Difficulties),
            "not_started" => Some(Self::NotStarted),
            _ => None,
        }
    }

    /// Text written to the progress column.
    pub fn sheet_label(&self) -> &'static str {
        match self {
            Self::OnTrack => "On track",
            Self::Difficulties => "Having difficulties",
            Self::NotStarted => "Not started yet",
        }
    }
}
