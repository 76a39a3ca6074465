//! OAuth device login and session credentials for the TIDAL API.

use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use super::models::Quality;

/// OAuth endpoint base.
const AUTH_BASE_URL: &str = "https://auth.tidal.com/v1/oauth2";

/// Scopes requested for the device login.
const SCOPES: &str = "r_usr w_usr w_sub";

/// Grant type for device-code polling.
const DEVICE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("No OAuth client id configured")]
    MissingClientId,

    #[error("Device code expired before the login was confirmed")]
    Expired,

    #[error("Login cancelled")]
    Cancelled,

    #[error("Token request rejected: {0}")]
    Rejected(String),
}

/// Pending device authorization shown to the user.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceAuthorization {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    #[serde(default)]
    pub verification_uri_complete: Option<String>,
    /// Seconds until the device code expires
    pub expires_in: u64,
    /// Polling interval in seconds
    #[serde(default = "default_interval")]
    pub interval: u64,
}

fn default_interval() -> u64 {
    2
}

impl DeviceAuthorization {
    /// Link the user should open to confirm the login.
    pub fn link(&self) -> String {
        let link = self
            .verification_uri_complete
            .clone()
            .unwrap_or_else(|| self.verification_uri.clone());
        if link.starts_with("http") {
            link
        } else {
            format!("https://{link}")
        }
    }
}

/// User info returned alongside a token.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUser {
    pub user_id: u64,
    pub country_code: String,
}

/// Token response of the OAuth endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TokenSet {
    pub token_type: String,
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime in seconds
    pub expires_in: i64,
    #[serde(default)]
    pub user: Option<TokenUser>,
}

#[derive(Debug, Deserialize)]
struct OAuthErrorBody {
    #[serde(default)]
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Credentials and preferences for API requests.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub token_type: String,
    pub access_token: String,
    pub refresh_token: String,
    pub expiry_time: Option<DateTime<Utc>>,
    pub user_id: Option<String>,
    pub country_code: String,
    pub quality: Quality,
}

impl Session {
    /// Whether there is an access token at all.
    pub fn has_token(&self) -> bool {
        !self.access_token.is_empty()
    }

    /// Whether the access token is past its expiry time.
    ///
    /// A session without a known expiry is treated as valid.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry_time.is_some_and(|expiry| expiry <= now)
    }

    /// Value of the `Authorization` header.
    pub fn authorization(&self) -> String {
        let token_type = if self.token_type.is_empty() {
            "Bearer"
        } else {
            &self.token_type
        };
        format!("{} {}", token_type, self.access_token)
    }

    /// Replace the credentials with a freshly issued token.
    pub fn apply_tokens(&mut self, tokens: &TokenSet, now: DateTime<Utc>) {
        self.token_type = tokens.token_type.clone();
        self.access_token = tokens.access_token.clone();
        if let Some(refresh) = &tokens.refresh_token {
            self.refresh_token = refresh.clone();
        }
        self.expiry_time = Some(now + chrono::Duration::seconds(tokens.expires_in));
        if let Some(user) = &tokens.user {
            self.user_id = Some(user.user_id.to_string());
            self.country_code = user.country_code.clone();
        }
    }

    /// Drop all credentials, keeping preferences.
    pub fn clear(&mut self) {
        *self = Self {
            quality: self.quality,
            ..Self::default()
        };
    }
}

/// Parse a stored expiry time.
///
/// RFC 3339 is what we write; a naive `YYYY-MM-DD HH:MM:SS[.ffffff]` is
/// accepted as UTC for settings written by other clients.
pub fn parse_expiry(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Client for the OAuth endpoints.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    http: Client,
    client_id: String,
    client_secret: Option<String>,
}

impl OAuthClient {
    pub fn new(http: Client, client_id: impl Into<String>, client_secret: Option<String>) -> Self {
        Self {
            http,
            client_id: client_id.into(),
            client_secret,
        }
    }

    fn ensure_client_id(&self) -> Result<(), AuthError> {
        if self.client_id.is_empty() {
            Err(AuthError::MissingClientId)
        } else {
            Ok(())
        }
    }

    /// Start a device login.
    pub async fn start_device_login(&self) -> Result<DeviceAuthorization, AuthError> {
        self.ensure_client_id()?;

        let response = self
            .http
            .post(format!("{AUTH_BASE_URL}/device_authorization"))
            .form(&[("client_id", self.client_id.as_str()), ("scope", SCOPES)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AuthError::Rejected(read_oauth_error(response).await));
        }

        Ok(response.json().await?)
    }

    /// Poll once for the device token. `Ok(None)` means the user has not
    /// confirmed the login yet.
    pub async fn poll_device_token(
        &self,
        device: &DeviceAuthorization,
    ) -> Result<Option<TokenSet>, AuthError> {
        let response = self
            .token_request(&[
                ("client_id", self.client_id.as_str()),
                ("device_code", device.device_code.as_str()),
                ("grant_type", DEVICE_GRANT),
                ("scope", SCOPES),
            ])
            .await?;

        match response.status() {
            status if status.is_success() => Ok(Some(response.json().await?)),
            StatusCode::BAD_REQUEST => {
                let body: OAuthErrorBody = response.json().await?;
                match body.error.as_str() {
                    "authorization_pending" | "slow_down" => Ok(None),
                    "expired_token" => Err(AuthError::Expired),
                    _ => Err(AuthError::Rejected(
                        body.error_description.unwrap_or(body.error),
                    )),
                }
            }
            _ => Err(AuthError::Rejected(read_oauth_error(response).await)),
        }
    }

    /// Poll until the user confirms the login, the code expires, or `cancel` fires.
    pub async fn wait_for_device_token(
        &self,
        device: &DeviceAuthorization,
        cancel: &CancellationToken,
    ) -> Result<TokenSet, AuthError> {
        let interval = Duration::from_secs(device.interval.max(1));
        let deadline = tokio::time::Instant::now() + Duration::from_secs(device.expires_in);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Err(AuthError::Cancelled),
                _ = tokio::time::sleep(interval) => {}
            }

            if let Some(tokens) = self.poll_device_token(device).await? {
                return Ok(tokens);
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(AuthError::Expired);
            }
        }
    }

    /// Exchange a refresh token for a new access token.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenSet, AuthError> {
        self.ensure_client_id()?;

        let response = self
            .token_request(&[
                ("client_id", self.client_id.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
                ("scope", SCOPES),
            ])
            .await?;

        if !response.status().is_success() {
            return Err(AuthError::Rejected(read_oauth_error(response).await));
        }

        Ok(response.json().await?)
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<reqwest::Response, AuthError> {
        let mut request = self.http.post(format!("{AUTH_BASE_URL}/token")).form(form);
        if let Some(secret) = &self.client_secret {
            request = request.basic_auth(&self.client_id, Some(secret));
        }
        Ok(request.send().await?)
    }
}

async fn read_oauth_error(response: reqwest::Response) -> String {
    let status = response.status();
    match response.json::<OAuthErrorBody>().await {
        Ok(body) => body.error_description.unwrap_or(body.error),
        Err(_) => format!("HTTP {status}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_set(expires_in: i64) -> TokenSet {
        TokenSet {
            token_type: String::from("Bearer"),
            access_token: String::from("access"),
            refresh_token: Some(String::from("refresh")),
            expires_in,
            user: Some(TokenUser {
                user_id: 42,
                country_code: String::from("NO"),
            }),
        }
    }

    #[test]
    fn test_apply_tokens_sets_expiry_and_user() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let mut session = Session::default();
        session.apply_tokens(&token_set(3600), now);

        assert!(session.has_token());
        assert_eq!(session.user_id.as_deref(), Some("42"));
        assert_eq!(session.country_code, "NO");
        assert!(!session.is_expired(now));
        assert!(session.is_expired(now + chrono::Duration::seconds(3600)));
        assert_eq!(session.authorization(), "Bearer access");
    }

    #[test]
    fn test_refresh_without_new_refresh_token_keeps_old_one() {
        let now = Utc::now();
        let mut session = Session {
            refresh_token: String::from("old"),
            ..Session::default()
        };
        let mut tokens = token_set(60);
        tokens.refresh_token = None;
        session.apply_tokens(&tokens, now);
        assert_eq!(session.refresh_token, "old");
    }

    #[test]
    fn test_clear_keeps_quality() {
        let mut session = Session {
            access_token: String::from("a"),
            quality: Quality::HiRes,
            ..Session::default()
        };
        session.clear();
        assert!(!session.has_token());
        assert_eq!(session.quality, Quality::HiRes);
    }

    #[test]
    fn test_parse_expiry_formats() {
        let rfc = parse_expiry("2024-05-01T12:00:00+00:00").unwrap();
        let naive = parse_expiry("2024-05-01 12:00:00.250000").unwrap();
        assert_eq!(rfc, Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());
        assert_eq!(naive.timestamp(), rfc.timestamp());
        assert!(parse_expiry("").is_none());
        assert!(parse_expiry("tomorrow").is_none());
    }

    #[test]
    fn test_device_link_gets_scheme() {
        let device = DeviceAuthorization {
            device_code: String::from("d"),
            user_code: String::from("ABCDE"),
            verification_uri: String::from("link.tidal.com"),
            verification_uri_complete: Some(String::from("link.tidal.com/ABCDE")),
            expires_in: 300,
            interval: 2,
        };
        assert_eq!(device.link(), "https://link.tidal.com/ABCDE");
    }

    #[test]
    fn test_missing_client_id_is_rejected() {
        let client = OAuthClient::new(Client::new(), "", None);
        assert!(matches!(
            client.ensure_client_id(),
            Err(AuthError::MissingClientId)
        ));
    }
}
