//! Configuration module for Gmail credentials and server settings
//!
//! All configuration is loaded from environment variables prefixed with
//! `GMAIL_MCP_`. OAuth credentials come either from an authorized-user token
//! file (`GMAIL_MCP_TOKEN_FILE`) or from individual variables.

use std::env;
use std::env::VarError;
use std::fs;

use secrecy::SecretString;
use serde::Deserialize;

use crate::errors::{AppError, AppResult};

const DEFAULT_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1";
const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
/// Largest page the provider accepts for `users.messages.list`
pub const MAX_RESULTS_LIMIT: u32 = 500;

/// OAuth client credentials and long-lived refresh token
///
/// Secrets are stored using `SecretString` to prevent accidental logging.
#[derive(Debug, Clone)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: SecretString,
    pub refresh_token: SecretString,
}

/// Server-wide configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub credentials: OAuthCredentials,
    /// Gmail REST base URL without trailing slash
    pub api_base: String,
    /// OAuth token endpoint
    pub token_url: String,
    /// Mailbox owner, `me` for the authenticated user
    pub user_id: String,
    /// Page size used when `get_unread_emails` omits `max_results`
    pub default_max_results: u32,
}

impl ServerConfig {
    /// Load all configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if required environment variables are missing
    /// or malformed, or if the token file cannot be read.
    ///
    /// # Example Environment
    ///
    /// ```text
    /// GMAIL_MCP_CLIENT_ID=1234.apps.googleusercontent.com
    /// GMAIL_MCP_CLIENT_SECRET=secret
    /// GMAIL_MCP_REFRESH_TOKEN=1//refresh
    /// GMAIL_MCP_DEFAULT_MAX_RESULTS=20
    /// ```
    pub fn load_from_env() -> AppResult<Self> {
        let credentials = match optional_env("GMAIL_MCP_TOKEN_FILE")? {
            Some(path) => load_token_file(&path)?,
            None => OAuthCredentials {
                client_id: required_env("GMAIL_MCP_CLIENT_ID")?,
                client_secret: SecretString::new(required_env("GMAIL_MCP_CLIENT_SECRET")?.into()),
                refresh_token: SecretString::new(required_env("GMAIL_MCP_REFRESH_TOKEN")?.into()),
            },
        };

        let default_max_results = parse_u32_env("GMAIL_MCP_DEFAULT_MAX_RESULTS", 10)?;
        if !(1..=MAX_RESULTS_LIMIT).contains(&default_max_results) {
            return Err(AppError::InvalidInput(format!(
                "GMAIL_MCP_DEFAULT_MAX_RESULTS must be in range 1..{MAX_RESULTS_LIMIT}"
            )));
        }

        Ok(Self {
            credentials,
            api_base: normalize_base_url(
                &optional_env("GMAIL_MCP_API_BASE")?.unwrap_or_else(|| DEFAULT_API_BASE.to_owned()),
            ),
            token_url: optional_env("GMAIL_MCP_TOKEN_URL")?
                .unwrap_or_else(|| DEFAULT_TOKEN_URL.to_owned()),
            user_id: optional_env("GMAIL_MCP_USER_ID")?.unwrap_or_else(|| "me".to_owned()),
            default_max_results,
        })
    }
}

/// Authorized-user file as written by Google's OAuth installed-app flow
#[derive(Deserialize)]
struct AuthorizedUserFile {
    client_id: String,
    client_secret: String,
    refresh_token: String,
}

/// Read OAuth credentials from an authorized-user JSON file
fn load_token_file(path: &str) -> AppResult<OAuthCredentials> {
    let contents = fs::read_to_string(path)
        .map_err(|e| AppError::InvalidInput(format!("cannot read token file {path}: {e}")))?;
    parse_authorized_user(&contents)
        .map_err(|e| AppError::InvalidInput(format!("invalid token file {path}: {e}")))
}

fn parse_authorized_user(contents: &str) -> Result<OAuthCredentials, String> {
    let file: AuthorizedUserFile = serde_json::from_str(contents).map_err(|e| e.to_string())?;
    if file.refresh_token.trim().is_empty() {
        return Err("refresh_token is empty".to_owned());
    }
    Ok(OAuthCredentials {
        client_id: file.client_id,
        client_secret: SecretString::new(file.client_secret.into()),
        refresh_token: SecretString::new(file.refresh_token.into()),
    })
}

fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_owned()
}

/// Read a required environment variable, returning error if missing or empty
fn required_env(key: &str) -> AppResult<String> {
    match env::var(key) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(AppError::InvalidInput(format!(
            "missing required environment variable {key}"
        ))),
    }
}

/// Read an optional environment variable; empty values count as unset
fn optional_env(key: &str) -> AppResult<Option<String>> {
    match env::var(key) {
        Ok(v) if v.trim().is_empty() => Ok(None),
        Ok(v) => Ok(Some(v)),
        Err(VarError::NotPresent) => Ok(None),
        Err(VarError::NotUnicode(_)) => Err(AppError::InvalidInput(format!(
            "environment variable {key} contains non-unicode data"
        ))),
    }
}

/// Parse a `u32` environment variable with default fallback
///
/// # Errors
///
/// Returns `InvalidInput` if the variable is set but not a valid `u32`.
fn parse_u32_env(key: &str, default: u32) -> AppResult<u32> {
    match optional_env(key)? {
        Some(v) => v.trim().parse::<u32>().map_err(|_| {
            AppError::InvalidInput(format!("invalid u32 environment variable {key}: '{v}'"))
        }),
        None => Ok(default),
    }
}
