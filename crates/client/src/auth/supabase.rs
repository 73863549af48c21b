//! GoTrue-compatible auth provider (Supabase Auth).

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use stockcount_core::Email;
use tracing::{debug, instrument, warn};
use url::Url;
use uuid::Uuid;

use super::{AuthError, AuthProvider, AuthResponse, Session, User};
use crate::config::AuthConfig;

const CODE_USER_EXISTS: &str = "user_already_exists";
const CODE_INVALID_CREDENTIALS: &str = "invalid_credentials";

/// Supabase Auth client.
///
/// Every request carries the project's anon key in the `apikey` header;
/// user-scoped requests add the session's bearer token.
#[derive(Clone)]
pub struct SupabaseAuth {
    inner: Arc<SupabaseAuthInner>,
}

struct SupabaseAuthInner {
    client: reqwest::Client,
    /// `{project}/auth/v1`, no trailing slash
    base_url: String,
    anon_key: SecretString,
}

impl std::fmt::Debug for SupabaseAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseAuth")
            .field("base_url", &self.inner.base_url)
            .field("anon_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

/// Session-bearing response of the token and signup endpoints.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    /// Token lifetime in seconds.
    #[serde(default)]
    expires_in: Option<i64>,
    /// Absolute expiry as a Unix timestamp (newer servers).
    #[serde(default)]
    expires_at: Option<i64>,
    user: User,
}

impl TokenResponse {
    fn into_session(self) -> Session {
        let now = chrono::Utc::now().timestamp();
        Session {
            access_token: SecretString::from(self.access_token),
            refresh_token: self.refresh_token.map(SecretString::from),
            expires_at: self
                .expires_at
                .or_else(|| self.expires_in.map(|secs| now + secs)),
            user: self.user,
        }
    }
}

/// User object returned by signup when no session is issued.
#[derive(Deserialize)]
struct SignUpUser {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
    /// Empty for an address that already exists (the provider hides this
    /// to avoid account enumeration).
    #[serde(default)]
    identities: Option<Vec<Value>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(TokenResponse),
    User(SignUpUser),
    Nested {
        #[serde(default)]
        user: Option<SignUpUser>,
        #[serde(default)]
        session: Option<TokenResponse>,
    },
}

/// Error body. GoTrue has used several shapes across versions.
#[derive(Deserialize, Default)]
struct ErrorBody {
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    code: Option<Value>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl SupabaseAuth {
    /// Create a new client for the configured project.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Network` if the HTTP client cannot be built, or
    /// `AuthError::Config` if the project URL cannot be extended.
    pub fn new(config: &AuthConfig) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder().build()?;
        Self::with_client(client, &config.url, config.anon_key.clone())
    }

    /// Create a client that reuses an existing HTTP client.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Config` if the project URL cannot be extended.
    pub fn with_client(
        client: reqwest::Client,
        project_url: &Url,
        anon_key: SecretString,
    ) -> Result<Self, AuthError> {
        if project_url.cannot_be_a_base() {
            return Err(AuthError::Config(format!(
                "project URL cannot be a base: {project_url}"
            )));
        }
        let base_url = format!("{}/auth/v1", project_url.as_str().trim_end_matches('/'));

        Ok(Self {
            inner: Arc::new(SupabaseAuthInner {
                client,
                base_url,
                anon_key,
            }),
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.inner
            .client
            .request(method, format!("{}{path}", self.inner.base_url))
            .header("apikey", self.inner.anon_key.expose_secret())
    }

    async fn read<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, AuthError> {
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(provider_error(status, &text));
        }
        serde_json::from_str(&text).map_err(|e| AuthError::Decode(e.to_string()))
    }

    /// Exchange a refresh token for a new session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Provider` if the refresh token is rejected.
    #[instrument(skip(self, refresh_token))]
    pub async fn refresh(&self, refresh_token: &SecretString) -> Result<Session, AuthError> {
        let response = self
            .request(reqwest::Method::POST, "/token?grant_type=refresh_token")
            .json(&serde_json::json!({
                "refresh_token": refresh_token.expose_secret()
            }))
            .send()
            .await?;
        let token: TokenResponse = Self::read(response).await?;
        Ok(token.into_session())
    }

    /// Fetch the user behind an access token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Provider` if the token is not accepted.
    #[instrument(skip(self, access_token))]
    pub async fn user(&self, access_token: &SecretString) -> Result<User, AuthError> {
        let response = self
            .request(reqwest::Method::GET, "/user")
            .bearer_auth(access_token.expose_secret())
            .send()
            .await?;
        Self::read(response).await
    }
}

#[async_trait]
impl AuthProvider for SupabaseAuth {
    #[instrument(skip(self, password), fields(email = %email))]
    async fn sign_in(&self, email: &Email, password: &SecretString) -> Result<Session, AuthError> {
        let response = self
            .request(reqwest::Method::POST, "/token?grant_type=password")
            .json(&serde_json::json!({
                "email": email.as_str(),
                "password": password.expose_secret(),
            }))
            .send()
            .await?;
        let token: TokenResponse = Self::read(response).await?;
        debug!(user_id = %token.user.id, "signed in");
        Ok(token.into_session())
    }

    #[instrument(skip(self, password), fields(email = %email))]
    async fn sign_up(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<AuthResponse, AuthError> {
        let response = self
            .request(reqwest::Method::POST, "/signup")
            .json(&serde_json::json!({
                "email": email.as_str(),
                "password": password.expose_secret(),
            }))
            .send()
            .await?;
        let status = response.status();
        let body: SignUpResponse = Self::read(response).await?;

        let (user, session) = match body {
            SignUpResponse::Session(token) => (Some(signup_user(&token.user)), Some(token)),
            SignUpResponse::User(user) => (Some(user), None),
            SignUpResponse::Nested { user, session } => (user, session),
        };

        let Some(user) = user.filter(|user| user.identities.as_ref().is_none_or(|ids| !ids.is_empty()))
        else {
            return Err(AuthError::Provider {
                status: status.as_u16(),
                code: Some(CODE_USER_EXISTS.to_string()),
                message: "User already registered".to_string(),
            });
        };

        if session.is_none() {
            debug!(user_id = %user.id, "signed up, email confirmation pending");
        }

        Ok(AuthResponse {
            user: User {
                id: user.id,
                email: user.email,
            },
            session: session.map(TokenResponse::into_session),
        })
    }

    #[instrument(skip_all)]
    async fn sign_out(&self, session: &Session) -> Result<(), AuthError> {
        let response = self
            .request(reqwest::Method::POST, "/logout")
            .bearer_auth(session.access_token.expose_secret())
            .send()
            .await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let text = response.text().await.unwrap_or_default();
        Err(provider_error(status, &text))
    }

    #[instrument(skip_all, fields(user_id = %session.user.id))]
    async fn restore(&self, session: &Session) -> Result<Option<Session>, AuthError> {
        if !session.is_expired() {
            match self.user(&session.access_token).await {
                Ok(user) => {
                    let mut restored = session.clone();
                    restored.user = user;
                    return Ok(Some(restored));
                }
                Err(e) if e.is_rejection() => {
                    debug!(error = %e, "stored access token rejected");
                }
                Err(e) => return Err(e),
            }
        }

        let Some(refresh_token) = session.refresh_token.as_ref().filter(|_| session.can_refresh())
        else {
            return Ok(None);
        };

        match self.refresh(refresh_token).await {
            Ok(refreshed) => Ok(Some(refreshed)),
            Err(e) if e.is_rejection() => {
                warn!(error = %e, "refresh token rejected, signing out");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

/// Signup returns a full user; only the fields we check are copied.
fn signup_user(user: &User) -> SignUpUser {
    SignUpUser {
        id: user.id,
        email: user.email.clone(),
        identities: None,
    }
}

fn provider_error(status: StatusCode, text: &str) -> AuthError {
    let body: ErrorBody = serde_json::from_str(text).unwrap_or_default();

    let message = body
        .msg
        .or(body.message)
        .or(body.error_description)
        .or_else(|| body.error.clone())
        .or_else(|| (!text.trim().is_empty()).then(|| text.trim().to_string()))
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string()
        });

    let code = body
        .error_code
        .or_else(|| match body.code {
            Some(Value::String(code)) => Some(code),
            _ => None,
        })
        .or_else(|| {
            // Older servers answer a bad password with a bare OAuth error.
            (body.error.as_deref() == Some("invalid_grant")
                && message.to_lowercase().contains("invalid login credentials"))
            .then(|| CODE_INVALID_CREDENTIALS.to_string())
        });

    AuthError::Provider {
        status: status.as_u16(),
        code,
        message,
    }
}
