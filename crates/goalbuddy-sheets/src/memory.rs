//! Process-local worksheet.
//!
//! Selected with `SHEETS_BACKEND=memory` for local runs without Google
//! credentials; rows are lost on exit. Failures can be injected to exercise
//! the retry and error paths.

use crate::backend::SheetBackend;
use async_trait::async_trait;
use goalbuddy_core::error::GoalError;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use tokio::sync::Mutex;

/// In-memory `SheetBackend`.
#[derive(Default)]
pub struct MemorySheet {
    rows: Mutex<Vec<Vec<String>>>,
    rate_limits: AtomicU32,
    failures: AtomicU32,
    calls: AtomicUsize,
    writes: AtomicUsize,
}

impl MemorySheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with existing rows (row 1 first).
    pub fn with_rows(rows: Vec<Vec<String>>) -> Self {
        Self {
            rows: Mutex::new(rows),
            ..Self::default()
        }
    }

    /// Reject the next `n` calls as rate-limited.
    pub fn inject_rate_limits(&self, n: u32) {
        self.rate_limits.store(n, Ordering::SeqCst);
    }

    /// Fail the next `n` calls with a non-retryable storage error.
    pub fn inject_failures(&self, n: u32) {
        self.failures.store(n, Ordering::SeqCst);
    }

    /// Snapshot of all rows.
    pub async fn rows(&self) -> Vec<Vec<String>> {
        self.rows.lock().await.clone()
    }

    /// Number of backend calls attempted, including rejected ones.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of successful appends and updates.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check_injected(&self) -> Result<(), GoalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if take_one(&self.failures) {
            return Err(GoalError::Storage("injected failure".into()));
        }
        if take_one(&self.rate_limits) {
            return Err(GoalError::RateLimited("injected RATE_LIMIT_EXCEEDED".into()));
        }
        Ok(())
    }
}

fn take_one(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

#[async_trait]
impl SheetBackend for MemorySheet {
    async fn get_all_values(&self) -> Result<Vec<Vec<String>>, GoalError> {
        self.check_injected()?;
        Ok(self.rows.lock().await.clone())
    }

    async fn append_row(&self, values: Vec<String>) -> Result<usize, GoalError> {
        self.check_injected()?;
        let mut rows = self.rows.lock().await;
        // Like the Sheets API, append after the last row that has content.
        while rows
            .last()
            .is_some_and(|r| r.iter().all(|c| c.is_empty()))
        {
            rows.pop();
        }
        rows.push(values);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(rows.len())
    }

    async fn update_row(
        &self,
        row: usize,
        first_col: usize,
        values: Vec<String>,
    ) -> Result<(), GoalError> {
        self.check_injected()?;
        if row == 0 || first_col == 0 {
            return Err(GoalError::Storage(format!(
                "invalid cell position row={row} col={first_col}"
            )));
        }
        let mut rows = self.rows.lock().await;
        if rows.len() < row {
            rows.resize_with(row, Vec::new);
        }
        let cells = &mut rows[row - 1];
        let end = first_col - 1 + values.len();
        if cells.len() < end {
            cells.resize(end, String::new());
        }
        for (i, value) in values.into_iter().enumerate() {
            cells[first_col - 1 + i] = value;
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[tokio::test]
    async fn test_append_returns_row_number() {
        let sheet = MemorySheet::new();
        assert_eq!(sheet.append_row(row(&["a", "b"])).await.unwrap(), 1);
        assert_eq!(sheet.append_row(row(&["c", "d"])).await.unwrap(), 2);
        assert_eq!(sheet.writes(), 2);
    }

    #[tokio::test]
    async fn test_update_pads_short_rows() {
        let sheet = MemorySheet::with_rows(vec![row(&["goal", "date"])]);
        sheet.update_row(1, 3, row(&["85", "later"])).await.unwrap();
        assert_eq!(sheet.rows().await[0], row(&["goal", "date", "85", "later"]));

        sheet.update_row(3, 2, row(&["x"])).await.unwrap();
        let rows = sheet.rows().await;
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2], row(&["", "x"]));
    }

    #[tokio::test]
    async fn test_update_rejects_zero_position() {
        let sheet = MemorySheet::new();
        assert!(sheet.update_row(0, 1, row(&["x"])).await.is_err());
    }

    #[tokio::test]
    async fn test_injected_errors_are_consumed() {
        let sheet = MemorySheet::new();
        sheet.inject_rate_limits(2);
        assert!(sheet.get_all_values().await.unwrap_err().is_rate_limited());
        assert!(sheet.get_all_values().await.unwrap_err().is_rate_limited());
        assert!(sheet.get_all_values().await.is_ok());

        sheet.inject_failures(1);
        let err = sheet.append_row(row(&["a"])).await.unwrap_err();
        assert!(!err.is_rate_limited());
        assert_eq!(sheet.calls(), 4);
        assert_eq!(sheet.writes(), 0);
    }
}
