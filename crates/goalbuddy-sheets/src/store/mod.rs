//! Persistence adapter between the conversation and the worksheet.
//!
//! Every backend call goes through the rate-limit retry wrapper. Lookups
//! scan all rows; the sheet is small and the scan keeps the sheet itself as
//! the only index.

mod records;
mod retry;

#[cfg(test)]
mod tests;

pub use records::{
    decode_row, format_timestamp, header, parse_timestamp, RecordKey, UserRecord,
    ANONYMOUS_HEADER, IDENTIFIED_HEADER, TIMESTAMP_FORMAT,
};
pub use retry::RetryPolicy;

use crate::backend::SheetBackend;
use goalbuddy_core::config::{RowLayout, Zone};
use goalbuddy_core::error::GoalError;
use goalbuddy_core::message::Sender;
use goalbuddy_core::sanitize::sanitize_cell;
use goalbuddy_core::state::{ProgressChoice, UserState};
use records::{anonymous, identified};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Goal/progress/assessment storage on top of a `SheetBackend`.
pub struct Store {
    backend: Arc<dyn SheetBackend>,
    layout: RowLayout,
    zone: Zone,
    retry: RetryPolicy,
}

impl Store {
    pub fn new(
        backend: Arc<dyn SheetBackend>,
        layout: RowLayout,
        zone: Zone,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            backend,
            layout,
            zone,
            retry,
        }
    }

    pub fn layout(&self) -> RowLayout {
        self.layout
    }

    /// Create the worksheet if needed and write the header into an empty one.
    pub async fn prepare(&self) -> Result<(), GoalError> {
        let backend = &self.backend;
        self.retry.run("prepare", || backend.prepare()).await?;

        let rows = self.all_rows().await?;
        let empty = rows
            .iter()
            .all(|r| r.iter().all(|c| c.trim().is_empty()));
        if empty {
            let header = records::header(self.layout);
            self.retry
                .run("write header", || backend.append_row(header.clone()))
                .await?;
            info!("initialized worksheet header ({:?} layout)", self.layout);
        }
        Ok(())
    }

    fn now(&self) -> String {
        format_timestamp(&self.zone.now())
    }

    async fn all_rows(&self) -> Result<Vec<Vec<String>>, GoalError> {
        let backend = &self.backend;
        self.retry
            .run("read rows", || backend.get_all_values())
            .await
    }

    async fn append(&self, values: Vec<String>) -> Result<usize, GoalError> {
        let backend = &self.backend;
        self.retry
            .run("append row", || backend.append_row(values.clone()))
            .await
    }

    async fn update(
        &self,
        row: usize,
        first_col: usize,
        values: Vec<String>,
    ) -> Result<(), GoalError> {
        let backend = &self.backend;
        self.retry
            .run("update row", || {
                backend.update_row(row, first_col, values.clone())
            })
            .await
    }

    /// All decoded records, in sheet order.
    pub async fn list_records(&self) -> Result<Vec<UserRecord>, GoalError> {
        let rows = self.all_rows().await?;
        Ok(rows
            .iter()
            .enumerate()
            .filter_map(|(i, cells)| decode_row(self.layout, i + 1, cells, self.zone))
            .collect())
    }

    /// Records whose persisted state is `state`.
    pub async fn list_by_state(&self, state: UserState) -> Result<Vec<UserRecord>, GoalError> {
        Ok(self
            .list_records()
            .await?
            .into_iter()
            .filter(|r| r.state == state)
            .collect())
    }

    pub async fn get_record(&self, key: RecordKey) -> Result<Option<UserRecord>, GoalError> {
        let rows = self.all_rows().await?;
        Ok(self.find(&rows, key))
    }

    fn find(&self, rows: &[Vec<String>], key: RecordKey) -> Option<UserRecord> {
        match (key, self.layout) {
            (RecordKey::Row(row), _) => {
                let cells = rows.get(row.checked_sub(1)?)?;
                decode_row(self.layout, row, cells, self.zone)
            }
            (RecordKey::User(id), RowLayout::Identified) => rows
                .iter()
                .enumerate()
                .filter_map(|(i, cells)| decode_row(self.layout, i + 1, cells, self.zone))
                .find(|r| r.user_id == Some(id)),
            (RecordKey::User(_), RowLayout::Anonymous) => None,
        }
    }

    /// Persist a new goal and return the row holding it.
    ///
    /// Identified layout: rewrites the user's existing row (clearing progress
    /// and assessment) or appends one. Anonymous layout: always appends.
    pub async fn save_goal(&self, sender: &Sender, text: &str) -> Result<usize, GoalError> {
        let goal = sanitize_cell(text);
        if goal.was_modified {
            debug!(
                "sanitized goal from user {}: {}",
                sender.id,
                goal.warnings.join(", ")
            );
        }
        let now = self.now();

        match self.layout {
            RowLayout::Anonymous => {
                let row = self
                    .append(vec![goal.text, now, String::new(), String::new()])
                    .await?;
                info!("saved anonymous goal to row {row}");
                Ok(row)
            }
            RowLayout::Identified => {
                let values = vec![
                    sender.id.to_string(),
                    sanitize_cell(sender.display_name()).text,
                    sanitize_cell(&sender.full_name()).text,
                    goal.text,
                    now,
                    String::new(),
                    String::new(),
                    String::new(),
                    String::new(),
                    UserState::GoalSet.to_string(),
                ];
                let rows = self.all_rows().await?;
                let row = match self.find(&rows, RecordKey::User(sender.id)) {
                    Some(existing) => {
                        self.update(existing.row, identified::USER_ID, values).await?;
                        existing.row
                    }
                    None => self.append(values).await?,
                };
                info!("saved goal for user {} in row {row}", sender.id);
                Ok(row)
            }
        }
    }

    /// Record the day-2 progress answer.
    ///
    /// The anonymous layout has no progress column; the answer is only logged.
    pub async fn update_progress(
        &self,
        key: RecordKey,
        choice: ProgressChoice,
    ) -> Result<(), GoalError> {
        if self.layout == RowLayout::Anonymous {
            debug!("progress {choice:?} for {key:?} not persisted (anonymous layout)");
            return Ok(());
        }

        let record = self.require(key).await?;
        // The assessment cells (H..I) are left alone.
        self.update(
            record.row,
            identified::PROGRESS,
            vec![choice.sheet_label().to_string(), self.now()],
        )
        .await?;
        self.update(
            record.row,
            identified::STATE,
            vec![UserState::ProgressRecorded.to_string()],
        )
        .await?;
        info!("recorded progress {choice:?} in row {}", record.row);
        Ok(())
    }

    /// Record the final self-assessment.
    pub async fn save_assessment(&self, key: RecordKey, score: u8) -> Result<(), GoalError> {
        let record = self.require(key).await?;
        let mut values = vec![score.to_string(), self.now()];
        let first_col = match self.layout {
            RowLayout::Identified => {
                values.push(UserState::Completed.to_string());
                identified::FINAL
            }
            RowLayout::Anonymous => anonymous::FINAL,
        };
        self.update(record.row, first_col, values).await?;
        info!("saved assessment {score}% in row {}", record.row);
        Ok(())
    }

    /// Overwrite the persisted state of an existing record.
    ///
    /// Returns `false` when there is nothing to update: no record yet, or the
    /// anonymous layout, which has no state column.
    pub async fn save_state(&self, key: RecordKey, state: UserState) -> Result<bool, GoalError> {
        if self.layout == RowLayout::Anonymous {
            return Ok(false);
        }
        let Some(record) = self.get_record(key).await? else {
            return Ok(false);
        };
        if record.state == state {
            return Ok(true);
        }
        self.update(record.row, identified::STATE, vec![state.to_string()])
            .await?;
        info!("state of row {} set to {state}", record.row);
        Ok(true)
    }

    async fn require(&self, key: RecordKey) -> Result<UserRecord, GoalError> {
        self.get_record(key).await?.ok_or_else(|| {
            warn!("no record for {key:?}");
            GoalError::Storage(format!("no record for {key:?}"))
        })
    }
}
