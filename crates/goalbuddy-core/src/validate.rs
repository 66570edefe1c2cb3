//! Input validation for goal text and self-assessment scores.

/// Minimum goal length in characters, after trimming.
pub const GOAL_MIN_CHARS: usize = 10;
/// Maximum goal length in characters, after trimming.
pub const GOAL_MAX_CHARS: usize = 500;

/// Why a goal text was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalRejection {
    TooShort,
    TooLong,
}

/// Validate goal text length. Returns the trimmed text on success.
///
/// Length is counted in Unicode scalar values, not bytes.
pub fn validate_goal_text(text: &str) -> Result<&str, GoalRejection> {
    let trimmed = text.trim();
    let len = trimmed.chars().count();
    if len < GOAL_MIN_CHARS {
        return Err(GoalRejection::TooShort);
    }
    if len > GOAL_MAX_CHARS {
        return Err(GoalRejection::TooLong);
    }
    Ok(trimmed)
}

/// Validate a self-assessment score in `0..=100`.
///
/// Accepts exactly one integer token with optional surrounding whitespace:
/// no sign, no zero padding (a lone `0` is fine), no trailing junk.
pub fn validate_score(text: &str) -> Option<u8> {
    let token = text.trim();
    if token.is_empty() || token.len() > 3 || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if token.len() > 1 && token.starts_with('0') {
        return None;
    }
    let value: u8 = token.parse().ok()?;
    (value <= 100).then_some(value)
}
