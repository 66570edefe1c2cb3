mod defaults;
mod zone;


use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::GoalError;
use defaults::*;

pub use zone::{parse_utc_offset, Zone};

/// Reminder delay in production.
pub const REMINDER_DELAY_SECS: u64 = 24 * 60 * 60;
/// Reminder delay in testing mode.
pub const TESTING_REMINDER_DELAY_SECS: u64 = 60;

/// Top-level GoalBuddy configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub sheets: SheetsConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Conversation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Language for user-facing texts ("English", "Russian").
    #[serde(default = "default_language")]
    pub language: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
        }
    }
}

/// Telegram bot config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    /// Allowed Telegram user ids. Empty = allow all.
    #[serde(default)]
    pub allowed_users: Vec<i64>,
}

/// Which row store to use.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SheetsBackend {
    /// Google Sheets v4 REST API.
    #[default]
    Google,
    /// Process-local rows, lost on exit. For local runs without credentials.
    Memory,
}

/// Column layout of the participant sheet.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowLayout {
    /// One row per Telegram user, keyed by user id.
    #[default]
    Identified,
    /// Goal and assessment only; the row number is the only key.
    Anonymous,
}

/// Spreadsheet storage config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetsConfig {
    #[serde(default)]
    pub backend: SheetsBackend,
    #[serde(default)]
    pub spreadsheet_id: String,
    /// Path to a service-account JSON key.
    #[serde(default = "default_credentials_path")]
    pub credentials_path: String,
    /// Inline service-account JSON. Takes precedence over `credentials_path`.
    #[serde(default)]
    pub credentials_json: Option<String>,
    #[serde(default = "default_worksheet")]
    pub worksheet: String,
    #[serde(default)]
    pub layout: RowLayout,
    /// First back-off delay after a rate-limit rejection; doubles per retry.
    #[serde(default = "default_retry_base_ms")]
    pub retry_base_ms: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            backend: SheetsBackend::default(),
            spreadsheet_id: String::new(),
            credentials_path: default_credentials_path(),
            credentials_json: None,
            worksheet: default_worksheet(),
            layout: RowLayout::default(),
            retry_base_ms: default_retry_base_ms(),
            max_retries: default_max_retries(),
        }
    }
}

impl SheetsConfig {
    fn has_credentials(&self) -> bool {
        match self.credentials_json.as_deref() {
            Some(json) if !json.trim().is_empty() => true,
            _ => Path::new(&self.credentials_path).exists(),
        }
    }
}

/// What recovery does with reminders whose fire time passed while the
/// process was down.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverduePolicy {
    /// Never deliver a stale reminder.
    #[default]
    Drop,
    /// Deliver overdue reminders right away.
    Fire,
}

/// Reminder scheduler config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Zone for persisted timestamps: an IANA name ("Europe/Moscow") or a
    /// fixed offset ("+03:00", "UTC").
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Shortens the reminder delay from 24 hours to 60 seconds.
    #[serde(default)]
    pub testing_mode: bool,
    #[serde(default)]
    pub overdue: OverduePolicy,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            testing_mode: false,
            overdue: OverduePolicy::default(),
        }
    }
}

impl SchedulerConfig {
    pub fn reminder_delay(&self) -> Duration {
        if self.testing_mode {
            Duration::from_secs(TESTING_REMINDER_DELAY_SECS)
        } else {
            Duration::from_secs(REMINDER_DELAY_SECS)
        }
    }

    pub fn zone(&self) -> Result<Zone, GoalError> {
        Zone::parse(&self.timezone).ok_or_else(|| {
            GoalError::Config(format!(
                "invalid SCHEDULER_TIMEZONE '{}' (expected a zone like Europe/Moscow or an offset like +03:00)",
                self.timezone
            ))
        })
    }
}

/// Logging config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Optional log file. Console logging is always on.
    #[serde(default)]
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl Config {
    /// Overlay environment variables on top of file values.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Overlay values from `lookup`. Empty values are ignored.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("BOT_TOKEN").or_else(|| get("TELEGRAM_BOT_TOKEN")) {
            self.telegram.bot_token = v;
        }
        if let Some(v) = get("SPREADSHEET_ID") {
            self.sheets.spreadsheet_id = v;
        }
        if let Some(v) = get("CREDENTIALS_PATH") {
            self.sheets.credentials_path = v;
        }
        if let Some(v) = get("GOOGLE_CREDENTIALS") {
            self.sheets.credentials_json = Some(v);
        }
        if let Some(v) = get("SHEETS_BACKEND") {
            match v.to_lowercase().as_str() {
                "google" => self.sheets.backend = SheetsBackend::Google,
                "memory" => self.sheets.backend = SheetsBackend::Memory,
                other => tracing::warn!("ignoring unknown SHEETS_BACKEND '{other}'"),
            }
        }
        if let Some(v) = get("SHEETS_LAYOUT") {
            match v.to_lowercase().as_str() {
                "identified" => self.sheets.layout = RowLayout::Identified,
                "anonymous" => self.sheets.layout = RowLayout::Anonymous,
                other => tracing::warn!("ignoring unknown SHEETS_LAYOUT '{other}'"),
            }
        }
        if let Some(v) = get("SCHEDULER_TIMEZONE") {
            self.scheduler.timezone = v;
        }
        if let Some(v) = get("TESTING_MODE") {
            self.scheduler.testing_mode = v.trim().eq_ignore_ascii_case("true");
        }
        if let Some(v) = get("OVERDUE_REMINDERS") {
            match v.to_lowercase().as_str() {
                "drop" => self.scheduler.overdue = OverduePolicy::Drop,
                "fire" => self.scheduler.overdue = OverduePolicy::Fire,
                other => tracing::warn!("ignoring unknown OVERDUE_REMINDERS '{other}'"),
            }
        }
        if let Some(v) = get("LOG_LEVEL") {
            self.logging.level = v.to_lowercase();
        }
        if let Some(v) = get("LOG_FILE") {
            self.logging.file = Some(v);
        }
        if let Some(v) = get("BOT_LANGUAGE") {
            self.bot.language = v;
        }
    }

    /// Check required settings. Returns every problem, not just the first.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.telegram.bot_token.trim().is_empty() {
            errors.push("BOT_TOKEN is not set".to_string());
        }

        if self.sheets.backend == SheetsBackend::Google {
            if self.sheets.spreadsheet_id.trim().is_empty() {
                errors.push("SPREADSHEET_ID is not set".to_string());
            }
            if !self.sheets.has_credentials() {
                errors.push(format!(
                    "Google credentials not found: set GOOGLE_CREDENTIALS or provide {}",
                    self.sheets.credentials_path
                ));
            }
        }

        if let Err(e) = self.scheduler.zone() {
            errors.push(e.to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Human-readable summary with secrets redacted.
    pub fn display(&self) -> String {
        let set = |present: bool| if present { "set" } else { "not set" };
        let credentials = match self.sheets.credentials_json.as_deref() {
            Some(json) if !json.trim().is_empty() => "inline (GOOGLE_CREDENTIALS)".to_string(),
            _ => self.sheets.credentials_path.clone(),
        };
        let delay = if self.scheduler.testing_mode {
            "ON (1 min delays)"
        } else {
            "OFF (24h delays)"
        };
        format!(
            "GoalBuddy configuration:\n  \
             Bot token: {}\n  \
             Storage backend: {:?}\n  \
             Spreadsheet ID: {}\n  \
             Credentials: {credentials}\n  \
             Worksheet: {} ({:?} layout)\n  \
             Timezone: {}\n  \
             Log level: {}\n  \
             Language: {}\n  \
             Testing mode: {delay}\n  \
             Overdue reminders: {:?}",
            set(!self.telegram.bot_token.is_empty()),
            self.sheets.backend,
            set(!self.sheets.spreadsheet_id.is_empty()),
            self.sheets.worksheet,
            self.sheets.layout,
            self.scheduler.timezone,
            self.logging.level,
            self.bot.language,
            self.scheduler.overdue,
        )
    }
}

/// Load configuration from an optional TOML file, then apply environment
/// overrides.
///
/// Falls back to defaults if the file does not exist.
pub fn load(path: &str) -> Result<Config, GoalError> {
    let path = Path::new(path);
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path).map_err(|e| {
            GoalError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str(&content)
            .map_err(|e| GoalError::Config(format!("failed to parse config: {}", e)))?
    } else {
        tracing::debug!(
            "config file not found at {}, using defaults",
            path.display()
        );
        Config::default()
    };

    config.apply_env();
    Ok(config)
}
