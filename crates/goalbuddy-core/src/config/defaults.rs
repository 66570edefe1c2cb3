//! Default value functions used by serde for config deserialization.

pub fn default_language() -> String {
    "English".to_string()
}

pub fn default_credentials_path() -> String {
    "credentials/google_credentials.json".to_string()
}

pub fn default_worksheet() -> String {
    "UserData".to_string()
}

pub fn default_timezone() -> String {
    "Europe/Moscow".to_string()
}

pub fn default_log_level() -> String {
    "info".to_string()
}

pub fn default_retry_base_ms() -> u64 {
    1000
}

pub fn default_max_retries() -> u32 {
    3
}
