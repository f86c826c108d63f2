//! Gmail REST API provider
//!
//! Implements [`MailProvider`] over the Gmail API v1:
//! - `users.messages.list` with `q=is:unread` for the unread listing
//! - `users.messages.get` (`full` or `metadata`) for message content
//! - `users.drafts.create` for threaded reply drafts
//!
//! # Authentication
//!
//! The client exchanges the configured refresh token for an access token once,
//! when the session is created at startup. The access token is cached for the
//! process lifetime and only re-exchanged when it is about to expire.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;

use crate::config::{OAuthCredentials, ServerConfig};
use crate::errors::{AppError, AppResult};
use crate::mime::RawMessage;
use crate::models::{DraftMessage, DraftRecord, DraftRequest, GmailMessage, ListMessagesResponse};
use crate::provider::{MailProvider, MessageFormat};

/// Refresh this long before the provider-reported expiry
const EXPIRY_SKEW: Duration = Duration::from_secs(60);
/// Assumed lifetime when the token endpoint omits `expires_in`
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(3_600);

/// Cached OAuth access token
struct AccessToken {
    value: SecretString,
    expires_at: Instant,
}

impl AccessToken {
    fn expires_soon(&self, now: Instant) -> bool {
        now + EXPIRY_SKEW >= self.expires_at
    }
}

#[derive(serde::Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<u64>,
}

/// Authenticated Gmail session
///
/// Built once by [`GmailClient::connect`] and shared by every tool call.
pub struct GmailClient {
    http: reqwest::Client,
    credentials: OAuthCredentials,
    token_url: String,
    /// `{api_base}/users/{user_id}`
    user_base: String,
    token: Mutex<AccessToken>,
}

impl GmailClient {
    /// Create the session and acquire the first access token
    ///
    /// # Errors
    ///
    /// - `AuthFailed` if the refresh token is rejected
    /// - `Provider` if the token endpoint cannot be reached
    pub async fn connect(config: &ServerConfig) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Internal(format!("http client setup failed: {e}")))?;

        let token = request_access_token(&http, &config.token_url, &config.credentials).await?;
        tracing::info!(user_id = %config.user_id, "Gmail session established");

        Ok(Self {
            http,
            credentials: config.credentials.clone(),
            token_url: config.token_url.clone(),
            user_base: users_url(&config.api_base, &config.user_id),
            token: Mutex::new(token),
        })
    }

    /// Current access token, exchanged again if it is about to expire
    async fn bearer(&self) -> AppResult<SecretString> {
        let mut token = self.token.lock().await;
        if token.expires_soon(Instant::now()) {
            *token = request_access_token(&self.http, &self.token_url, &self.credentials).await?;
            tracing::debug!("Gmail access token refreshed");
        }
        Ok(token.value.clone())
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> AppResult<T> {
        let token = self.bearer().await?;
        let response = self
            .http
            .get(format!("{}{path}", self.user_base))
            .bearer_auth(token.expose_secret())
            .query(query)
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("GET {path} failed: {e}")))?;
        handle_response(response).await
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> AppResult<T> {
        let token = self.bearer().await?;
        let response = self
            .http
            .post(format!("{}{path}", self.user_base))
            .bearer_auth(token.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("POST {path} failed: {e}")))?;
        handle_response(response).await
    }
}

#[async_trait]
impl MailProvider for GmailClient {
    async fn list_unread_message_ids(&self, max_results: u32) -> AppResult<Vec<String>> {
        let query = [
            ("q", "is:unread".to_owned()),
            ("maxResults", max_results.to_string()),
        ];
        let listing: ListMessagesResponse = self.get_json("/messages", &query).await?;
        let ids: Vec<String> = listing
            .messages
            .unwrap_or_default()
            .into_iter()
            .map(|m| m.id)
            .collect();
        tracing::debug!(count = ids.len(), "listed unread messages");
        Ok(ids)
    }

    async fn get_message(
        &self,
        id: &str,
        format: MessageFormat,
        header_names: &[&str],
    ) -> AppResult<GmailMessage> {
        let mut query = vec![("format", format.as_str().to_owned())];
        if format == MessageFormat::Metadata {
            query.extend(
                header_names
                    .iter()
                    .map(|name| ("metadataHeaders", (*name).to_owned())),
            );
        }
        tracing::debug!(message_id = id, format = format.as_str(), "fetching message");
        self.get_json(&format!("/messages/{}", urlencoding::encode(id)), &query)
            .await
    }

    async fn create_draft(&self, raw: &RawMessage, thread_id: &str) -> AppResult<DraftRecord> {
        let request = DraftRequest {
            message: DraftMessage {
                raw: raw.clone(),
                thread_id: thread_id.to_owned(),
            },
        };
        tracing::debug!(thread_id, raw_len = raw.as_str().len(), "creating draft");
        self.post_json("/drafts", &request).await
    }
}

/// Exchange the refresh token for a fresh access token
async fn request_access_token(
    http: &reqwest::Client,
    token_url: &str,
    credentials: &OAuthCredentials,
) -> AppResult<AccessToken> {
    let params = [
        ("client_id", credentials.client_id.as_str()),
        ("client_secret", credentials.client_secret.expose_secret()),
        ("refresh_token", credentials.refresh_token.expose_secret()),
        ("grant_type", "refresh_token"),
    ];
    let response = http
        .post(token_url)
        .form(&params)
        .send()
        .await
        .map_err(|e| AppError::Provider(format!("token endpoint unreachable: {e}")))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(AppError::AuthFailed(format!(
            "token refresh failed ({status}): {body}"
        )));
    }

    let token: TokenResponse = response
        .json()
        .await
        .map_err(|e| AppError::AuthFailed(format!("unreadable token response: {e}")))?;
    let lifetime = token
        .expires_in
        .map_or(DEFAULT_TOKEN_LIFETIME, Duration::from_secs);
    Ok(AccessToken {
        value: SecretString::new(token.access_token.into()),
        expires_at: Instant::now() + lifetime,
    })
}

/// Check status and decode a JSON response body
async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> AppResult<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(status_error(status, &body));
    }
    response
        .json()
        .await
        .map_err(|e| AppError::Provider(format!("unreadable Gmail API response: {e}")))
}

fn status_error(status: StatusCode, body: &str) -> AppError {
    match status {
        StatusCode::UNAUTHORIZED => AppError::AuthFailed(format!("Gmail API rejected token: {body}")),
        _ => AppError::Provider(format!("Gmail API error ({status}): {body}")),
    }
}

fn users_url(api_base: &str, user_id: &str) -> String {
    format!("{api_base}/users/{}", urlencoding::encode(user_id))
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use reqwest::StatusCode;
    use secrecy::SecretString;

    use super::{AccessToken, EXPIRY_SKEW, status_error, users_url};
    use crate::errors::AppError;

    #[test]
    fn token_is_refreshed_inside_expiry_skew() {
        let now = Instant::now();
        let token = AccessToken {
            value: SecretString::new("t".into()),
            expires_at: now + Duration::from_secs(3_600),
        };
        assert!(!token.expires_soon(now));
        assert!(token.expires_soon(now + Duration::from_secs(3_600) - EXPIRY_SKEW));
    }

    #[test]
    fn builds_user_scoped_urls() {
        assert_eq!(
            users_url("https://gmail.googleapis.com/gmail/v1", "me"),
            "https://gmail.googleapis.com/gmail/v1/users/me"
        );
        assert_eq!(
            users_url("http://localhost:8080", "jane@example.com"),
            "http://localhost:8080/users/jane%40example.com"
        );
    }

    #[test]
    fn maps_unauthorized_to_auth_failure() {
        assert!(matches!(
            status_error(StatusCode::UNAUTHORIZED, "expired"),
            AppError::AuthFailed(_)
        ));
        let err = status_error(StatusCode::NOT_FOUND, "Requested entity was not found.");
        assert!(matches!(err, AppError::Provider(_)));
        assert!(err.to_string().contains("404"));
    }
}
