//! Supabase auth client and identity resolution.
//!
//! The offline queue only needs to know *who* is signed in when it flushes;
//! [`IdentityProvider`] is that seam. [`SupabaseAuthClient`] talks to GoTrue
//! to sign in, refresh, and sign out, persisting sessions through
//! [`SessionPersistence`].

mod identity;

use std::fmt;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::util::{compact_text, is_http_url, normalize_text_option, unix_timestamp_now};

pub use identity::{Identity, IdentityProvider, SessionIdentityProvider, StaticIdentity};

const EXPIRY_SKEW_SECONDS: i64 = 60;
const AUTH_PATH: &str = "/auth/v1";
const AUTH_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
    pub user: AuthUser,
}

impl AuthSession {
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at <= unix_timestamp_now() + EXPIRY_SKEW_SECONDS
    }
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AuthSession")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid auth configuration: {0}")]
    InvalidConfiguration(&'static str),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Failed to parse JSON payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Missing {0}")]
    MissingCredential(&'static str),
    #[error("Auth API error: {0}")]
    Api(String),
    #[error("Secure storage error: {0}")]
    SecureStorage(String),
}

pub type AuthResult<T> = Result<T, AuthError>;

/// Where signed-in sessions live between runs
pub trait SessionPersistence: Clone + Send + Sync + 'static {
    fn load_session(&self) -> AuthResult<Option<AuthSession>>;
    fn save_session(&self, session: &AuthSession) -> AuthResult<()>;
    fn clear_session(&self) -> AuthResult<()>;
}

#[derive(Clone)]
pub struct SupabaseAuthClient<S: SessionPersistence> {
    auth_url: String,
    anon_key: String,
    client: Client,
    store: S,
}

impl<S: SessionPersistence> SupabaseAuthClient<S> {
    pub fn new(url: impl AsRef<str>, anon_key: impl Into<String>, store: S) -> AuthResult<Self> {
        let auth_url = normalize_auth_url(url.as_ref())?;
        let anon_key = anon_key.into().trim().to_string();
        if anon_key.is_empty() {
            return Err(AuthError::InvalidConfiguration(
                "Supabase anon key must not be empty",
            ));
        }

        Ok(Self {
            auth_url,
            anon_key,
            client: Client::builder().timeout(AUTH_TIMEOUT).build()?,
            store,
        })
    }

    /// Load the persisted session, refreshing it when it is about to expire.
    ///
    /// A session whose refresh fails is cleared and `None` is returned.
    pub async fn restore_session(&self) -> AuthResult<Option<AuthSession>> {
        let Some(session) = self.store.load_session()? else {
            return Ok(None);
        };
        if !session.is_expired() {
            return Ok(Some(session));
        }

        tracing::debug!("Stored session for {} expired, refreshing", session.user.id);
        match self.refresh_session(&session.refresh_token).await {
            Ok(refreshed) => Ok(Some(refreshed)),
            Err(error) => {
                tracing::warn!("Session refresh failed, signing out locally: {}", error);
                self.store.clear_session()?;
                Ok(None)
            }
        }
    }

    /// Password sign-in; the new session is persisted
    pub async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthSession> {
        let email = required(email, "email")?;
        let password = required(password, "password")?;
        self.exchange(TokenGrant::Password { email, password }).await
    }

    /// Trade a refresh token for a new session, persisting it
    pub async fn refresh_session(&self, refresh_token: &str) -> AuthResult<AuthSession> {
        let refresh_token = required(refresh_token, "refresh token")?;
        self.exchange(TokenGrant::RefreshToken(refresh_token)).await
    }

    /// Revoke `access_token` and forget the stored session.
    ///
    /// A 401 means the token was already revoked and counts as success.
    pub async fn sign_out(&self, access_token: &str) -> AuthResult<()> {
        let response = self
            .client
            .post(format!("{}/logout", self.auth_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() && status != StatusCode::UNAUTHORIZED {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Api(parse_api_error(status, &body)));
        }

        self.store.clear_session()
    }

    async fn exchange(&self, grant: TokenGrant<'_>) -> AuthResult<AuthSession> {
        let response = self
            .client
            .post(format!("{}/token", self.auth_url))
            .query(&[("grant_type", grant.grant_type())])
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
            .json(&grant.body())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Api(parse_api_error(status, &body)));
        }

        let session = response.json::<TokenResponse>().await?.into_session()?;
        self.store.save_session(&session)?;
        tracing::debug!("Stored session for {}", session.user.id);
        Ok(session)
    }
}

/// GoTrue base URL (`…/auth/v1`) for a Supabase project URL
pub fn normalize_auth_url(url: &str) -> AuthResult<String> {
    let base = url.trim().trim_end_matches('/');
    if base.is_empty() {
        return Err(AuthError::InvalidConfiguration(
            "Supabase URL must not be empty",
        ));
    }
    if !is_http_url(base) {
        return Err(AuthError::InvalidConfiguration(
            "Supabase URL must include http:// or https://",
        ));
    }

    Ok(if base.ends_with(AUTH_PATH) {
        base.to_string()
    } else {
        format!("{base}{AUTH_PATH}")
    })
}

fn required<'a>(value: &'a str, field: &'static str) -> AuthResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(AuthError::MissingCredential(field))
    } else {
        Ok(trimmed)
    }
}

enum TokenGrant<'a> {
    Password { email: &'a str, password: &'a str },
    RefreshToken(&'a str),
}

impl TokenGrant<'_> {
    const fn grant_type(&self) -> &'static str {
        match self {
            Self::Password { .. } => "password",
            Self::RefreshToken(_) => "refresh_token",
        }
    }

    fn body(&self) -> serde_json::Value {
        match self {
            Self::Password { email, password } => {
                serde_json::json!({ "email": email, "password": password })
            }
            Self::RefreshToken(token) => serde_json::json!({ "refresh_token": token }),
        }
    }
}

/// GoTrue `/token` response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_at: Option<i64>,
    expires_in: Option<i64>,
    user: Option<AuthUser>,
}

impl TokenResponse {
    fn into_session(self) -> AuthResult<AuthSession> {
        let expires_at = self
            .expires_at
            .or_else(|| self.expires_in.map(|ttl| unix_timestamp_now().saturating_add(ttl)));

        let (Some(access_token), Some(refresh_token), Some(expires_at), Some(user)) = (
            normalize_text_option(self.access_token),
            normalize_text_option(self.refresh_token),
            expires_at,
            self.user,
        ) else {
            return Err(AuthError::Api(
                "token response did not include a usable session".to_string(),
            ));
        };

        Ok(AuthSession {
            access_token,
            refresh_token,
            expires_at,
            user,
        })
    }
}

/// Error shapes GoTrue has used across versions
#[derive(Debug, Deserialize)]
struct AuthErrorBody {
    msg: Option<String>,
    message: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    let message = serde_json::from_str::<AuthErrorBody>(body)
        .ok()
        .and_then(|payload| {
            payload
                .msg
                .or(payload.message)
                .or(payload.error_description)
                .or(payload.error)
        })
        .unwrap_or_else(|| body.to_string());

    let message = compact_text(&message);
    if message.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{message} (HTTP {})", status.as_u16())
    }
}
