use async_trait::async_trait;
use goalbuddy_core::error::GoalError;

/// Row-oriented worksheet access.
///
/// Rows and columns are 1-based, as in A1 notation. Implementations map
/// throttling rejections to `GoalError::RateLimited` so the store can retry
/// them; every other failure is final.
#[async_trait]
pub trait SheetBackend: Send + Sync {
    /// Make sure the worksheet exists. Called once at startup.
    async fn prepare(&self) -> Result<(), GoalError> {
        Ok(())
    }

    /// Every row, first row first. Trailing empty cells may be missing.
    async fn get_all_values(&self) -> Result<Vec<Vec<String>>, GoalError>;

    /// Append a row after the last non-empty one and return its number.
    async fn append_row(&self, values: Vec<String>) -> Result<usize, GoalError>;

    /// Overwrite `values.len()` cells of `row`, starting at column `first_col`.
    async fn update_row(
        &self,
        row: usize,
        first_col: usize,
        values: Vec<String>,
    ) -> Result<(), GoalError>;
}
