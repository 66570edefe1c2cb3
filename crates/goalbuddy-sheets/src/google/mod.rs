//! Google Sheets v4 REST backend.
//!
//! Docs: <https://developers.google.com/sheets/api/reference/rest>

mod auth;

#[cfg(test)]
mod tests;

pub use auth::{prepare_credentials, ServiceAccountAuth, ServiceAccountKey, StaticToken, TokenSource};

use crate::backend::SheetBackend;
use async_trait::async_trait;
use goalbuddy_core::error::GoalError;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

const API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Rows and columns for a newly created worksheet.
const NEW_SHEET_ROWS: u32 = 1000;
const NEW_SHEET_COLS: u32 = 20;

/// One worksheet of a Google spreadsheet.
pub struct GoogleSheets {
    client: reqwest::Client,
    base_url: String,
    spreadsheet_id: String,
    worksheet: String,
    tokens: Arc<dyn TokenSource>,
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

#[derive(Deserialize)]
struct AppendResponse {
    updates: AppendUpdates,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendUpdates {
    updated_range: String,
}

#[derive(Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Deserialize)]
struct SheetProperties {
    title: String,
}

impl GoogleSheets {
    pub fn new(
        spreadsheet_id: impl Into<String>,
        worksheet: impl Into<String>,
        tokens: Arc<dyn TokenSource>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: API_BASE.to_string(),
            spreadsheet_id: spreadsheet_id.into(),
            worksheet: worksheet.into(),
            tokens,
        }
    }

    /// Overrides the API base URL (for testing with wiremock).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn spreadsheet_url(&self) -> String {
        format!("{}/{}", self.base_url, self.spreadsheet_id)
    }

    /// `/values/{range}` URL for a range within this worksheet.
    fn values_url(&self, cells: Option<&str>) -> String {
        let range = a1_range(&self.worksheet, cells);
        format!(
            "{}/values/{}",
            self.spreadsheet_url(),
            urlencoding::encode(&range)
        )
    }

    async fn bearer(&self) -> Result<String, GoalError> {
        Ok(format!("Bearer {}", self.tokens.token().await?))
    }

    async fn worksheet_titles(&self) -> Result<Vec<String>, GoalError> {
        let url = format!("{}?fields=sheets.properties.title", self.spreadsheet_url());
        let resp = self
            .client
            .get(&url)
            .header("Authorization", self.bearer().await?)
            .send()
            .await
            .map_err(|e| GoalError::Storage(format!("sheets metadata request failed: {e}")))?;
        let meta: SpreadsheetMeta = check(resp, "metadata")
            .await?
            .json()
            .await
            .map_err(|e| GoalError::Storage(format!("invalid sheets metadata: {e}")))?;
        Ok(meta.sheets.into_iter().map(|s| s.properties.title).collect())
    }
}

#[async_trait]
impl SheetBackend for GoogleSheets {
    async fn prepare(&self) -> Result<(), GoalError> {
        let titles = self.worksheet_titles().await?;
        if titles.iter().any(|t| t == &self.worksheet) {
            return Ok(());
        }

        warn!("worksheet '{}' not found, creating it", self.worksheet);
        let url = format!("{}:batchUpdate", self.spreadsheet_url());
        let body = json!({
            "requests": [{
                "addSheet": {
                    "properties": {
                        "title": self.worksheet,
                        "gridProperties": {
                            "rowCount": NEW_SHEET_ROWS,
                            "columnCount": NEW_SHEET_COLS,
                        }
                    }
                }
            }]
        });
        let resp = self
            .client
            .post(&url)
            .header("Authorization", self.bearer().await?)
            .json(&body)
            .send()
            .await
            .map_err(|e| GoalError::Storage(format!("sheets addSheet failed: {e}")))?;
        check(resp, "addSheet").await?;
        info!("created worksheet '{}'", self.worksheet);
        Ok(())
    }

    async fn get_all_values(&self) -> Result<Vec<Vec<String>>, GoalError> {
        let resp = self
            .client
            .get(self.values_url(None))
            .header("Authorization", self.bearer().await?)
            .send()
            .await
            .map_err(|e| GoalError::Storage(format!("sheets read failed: {e}")))?;
        let range: ValueRange = check(resp, "read")
            .await?
            .json()
            .await
            .map_err(|e| GoalError::Storage(format!("invalid sheets read response: {e}")))?;
        Ok(range.values)
    }

    async fn append_row(&self, values: Vec<String>) -> Result<usize, GoalError> {
        let url = format!(
            "{}:append?valueInputOption=USER_ENTERED&insertDataOption=INSERT_ROWS",
            self.values_url(None)
        );
        let resp = self
            .client
            .post(&url)
            .header("Authorization", self.bearer().await?)
            .json(&json!({ "values": [values] }))
            .send()
            .await
            .map_err(|e| GoalError::Storage(format!("sheets append failed: {e}")))?;
        let appended: AppendResponse = check(resp, "append")
            .await?
            .json()
            .await
            .map_err(|e| GoalError::Storage(format!("invalid sheets append response: {e}")))?;

        first_row_of_range(&appended.updates.updated_range).ok_or_else(|| {
            GoalError::Storage(format!(
                "cannot read row number from '{}'",
                appended.updates.updated_range
            ))
        })
    }

    async fn update_row(
        &self,
        row: usize,
        first_col: usize,
        values: Vec<String>,
    ) -> Result<(), GoalError> {
        if row == 0 || first_col == 0 || values.is_empty() {
            return Err(GoalError::Storage(format!(
                "invalid update at row={row} col={first_col}"
            )));
        }
        let last_col = first_col + values.len() - 1;
        let cells = format!(
            "{}{row}:{}{row}",
            column_letter(first_col),
            column_letter(last_col)
        );
        let url = format!("{}?valueInputOption=USER_ENTERED", self.values_url(Some(&cells)));
        let body = json!({
            "range": a1_range(&self.worksheet, Some(&cells)),
            "majorDimension": "ROWS",
            "values": [values],
        });
        let resp = self
            .client
            .put(&url)
            .header("Authorization", self.bearer().await?)
            .json(&body)
            .send()
            .await
            .map_err(|e| GoalError::Storage(format!("sheets update failed: {e}")))?;
        check(resp, "update").await?;
        Ok(())
    }
}

/// Pass successful responses through; map throttling to `RateLimited` and
/// everything else to `Storage` (or `Auth` for 401).
async fn check(resp: reqwest::Response, op: &str) -> Result<reqwest::Response, GoalError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let text = resp.text().await.unwrap_or_default();
    if status.as_u16() == 429
        || text.contains("RATE_LIMIT_EXCEEDED")
        || text.contains("RESOURCE_EXHAUSTED")
    {
        return Err(GoalError::RateLimited(format!("sheets {op} ({status}): {text}")));
    }
    if status.as_u16() == 401 {
        return Err(GoalError::Auth(format!("sheets {op} ({status}): {text}")));
    }
    Err(GoalError::Storage(format!("sheets {op} failed ({status}): {text}")))
}

/// `'Sheet Name'!A1:B2`, with embedded quotes doubled.
pub(crate) fn a1_range(worksheet: &str, cells: Option<&str>) -> String {
    let quoted = format!("'{}'", worksheet.replace('\'', "''"));
    match cells {
        Some(cells) => format!("{quoted}!{cells}"),
        None => quoted,
    }
}

/// 1-based column index to letters: 1 -> A, 26 -> Z, 27 -> AA.
pub(crate) fn column_letter(mut col: usize) -> String {
    let mut letters = Vec::new();
    while col > 0 {
        let rem = (col - 1) % 26;
        letters.push(b'A' + rem as u8);
        col = (col - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Row number of the first cell in an A1 range such as `'UserData'!A5:J5`.
pub(crate) fn first_row_of_range(range: &str) -> Option<usize> {
    let cells = range.rsplit_once('!').map_or(range, |(_, cells)| cells);
    let first = cells.split(':').next()?;
    let digits: String = first.chars().skip_while(|c| c.is_ascii_alphabetic()).collect();
    digits.parse().ok()
}
