//! Service-account OAuth: signs an RS256 JWT assertion and exchanges it for
//! an access token, cached until shortly before expiry.

use async_trait::async_trait;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use goalbuddy_core::config::SheetsConfig;
use goalbuddy_core::error::GoalError;
use ring::rand::SystemRandom;
use ring::signature::{RsaKeyPair, RSA_PKCS1_SHA256};
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Refresh this long before the token actually expires.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Supplies bearer tokens for Sheets API calls.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn token(&self) -> Result<String, GoalError>;
}

/// A fixed token. Used against mock servers.
pub struct StaticToken(pub String);

#[async_trait]
impl TokenSource for StaticToken {
    async fn token(&self) -> Result<String, GoalError> {
        Ok(self.0.clone())
    }
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

/// The fields of a service-account key file this client needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl ServiceAccountKey {
    pub fn from_json(json: &str) -> Result<Self, GoalError> {
        serde_json::from_str(json)
            .map_err(|e| GoalError::Auth(format!("invalid service account JSON: {e}")))
    }

    pub fn from_file(path: &Path) -> Result<Self, GoalError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            GoalError::Auth(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_json(&content)
    }

    /// Inline JSON wins over the key file path.
    pub fn from_config(config: &SheetsConfig) -> Result<Self, GoalError> {
        match config.credentials_json.as_deref() {
            Some(json) if !json.trim().is_empty() => Self::from_json(json),
            _ => Self::from_file(Path::new(&config.credentials_path)),
        }
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// `TokenSource` backed by a service-account key.
pub struct ServiceAccountAuth {
    key: ServiceAccountKey,
    key_pair: RsaKeyPair,
    client: reqwest::Client,
    cached: Mutex<Option<(String, Instant)>>,
}

impl ServiceAccountAuth {
    pub fn new(key: ServiceAccountKey) -> Result<Self, GoalError> {
        let der = pem_to_der(&key.private_key)?;
        let key_pair = RsaKeyPair::from_pkcs8(&der)
            .map_err(|e| GoalError::Auth(format!("rejected private key: {e}")))?;
        Ok(Self {
            key,
            key_pair,
            client: reqwest::Client::new(),
            cached: Mutex::new(None),
        })
    }

    /// Signed JWT assertion for the token endpoint.
    fn assertion(&self, issued_at: i64) -> Result<String, GoalError> {
        let header = json!({ "alg": "RS256", "typ": "JWT" });
        let claims = json!({
            "iss": self.key.client_email,
            "scope": SHEETS_SCOPE,
            "aud": self.key.token_uri,
            "iat": issued_at,
            "exp": issued_at + ASSERTION_LIFETIME_SECS,
        });
        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?),
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?)
        );

        let mut signature = vec![0u8; self.key_pair.public().modulus_len()];
        self.key_pair
            .sign(
                &RSA_PKCS1_SHA256,
                &SystemRandom::new(),
                signing_input.as_bytes(),
                &mut signature,
            )
            .map_err(|_| GoalError::Auth("failed to sign JWT assertion".into()))?;

        Ok(format!(
            "{signing_input}.{}",
            URL_SAFE_NO_PAD.encode(signature)
        ))
    }

    async fn fetch_token(&self) -> Result<(String, Instant), GoalError> {
        let assertion = self.assertion(chrono::Utc::now().timestamp())?;
        let body = format!(
            "grant_type={}&assertion={}",
            urlencoding::encode(JWT_BEARER_GRANT),
            urlencoding::encode(&assertion)
        );

        let resp = self
            .client
            .post(&self.key.token_uri)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .map_err(|e| GoalError::Auth(format!("token request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(GoalError::Auth(format!(
                "token exchange failed ({status}): {text}"
            )));
        }

        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| GoalError::Auth(format!("invalid token response: {e}")))?;
        let lifetime = Duration::from_secs(token.expires_in.unwrap_or(3600));
        debug!("obtained Google access token for {}", self.key.client_email);
        Ok((token.access_token, Instant::now() + lifetime))
    }
}

#[async_trait]
impl TokenSource for ServiceAccountAuth {
    async fn token(&self) -> Result<String, GoalError> {
        let mut cached = self.cached.lock().await;
        if let Some((token, expires_at)) = cached.as_ref() {
            if Instant::now() + EXPIRY_MARGIN < *expires_at {
                return Ok(token.clone());
            }
        }
        let (token, expires_at) = self.fetch_token().await?;
        *cached = Some((token.clone(), expires_at));
        Ok(token)
    }
}

/// Decode a PEM `PRIVATE KEY` block into PKCS#8 DER.
fn pem_to_der(pem: &str) -> Result<Vec<u8>, GoalError> {
    // Keys pasted into env vars often carry literal "\n" sequences.
    let pem = pem.replace("\\n", "\n");
    let body: String = pem
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("-----"))
        .collect();
    if body.is_empty() {
        return Err(GoalError::Auth("private key is empty".into()));
    }
    STANDARD
        .decode(body)
        .map_err(|e| GoalError::Auth(format!("private key is not valid base64: {e}")))
}

/// Validate a service-account key file and return it as one-line JSON,
/// ready to paste into `GOOGLE_CREDENTIALS`.
pub fn prepare_credentials(path: &Path) -> Result<String, GoalError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| GoalError::Config(format!("failed to read {}: {e}", path.display())))?;
    let value: serde_json::Value = serde_json::from_str(&content)
        .map_err(|e| GoalError::Config(format!("{} is not valid JSON: {e}", path.display())))?;

    if value.get("type").and_then(|v| v.as_str()) != Some("service_account") {
        return Err(GoalError::Config(
            "credentials are not a service account key (type != service_account)".into(),
        ));
    }
    for field in ["private_key", "client_email"] {
        let present = value
            .get(field)
            .and_then(|v| v.as_str())
            .is_some_and(|s| !s.trim().is_empty());
        if !present {
            return Err(GoalError::Config(format!(
                "credentials are missing '{field}'"
            )));
        }
    }

    Ok(serde_json::to_string(&value)?)
}
