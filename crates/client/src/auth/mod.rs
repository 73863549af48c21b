//! Authentication against the hosted auth provider.
//!
//! The provider sits behind the [`AuthProvider`] trait so the stores and the
//! application context can be exercised without a live project. The
//! production implementation is [`SupabaseAuth`].
//!
//! # Sessions
//!
//! A [`Session`] carries the bearer token attached to every inventory API
//! call. Tokens are held as [`SecretString`] and redacted from `Debug`; the
//! snapshot written to disk stores them in plain text, as a browser's local
//! storage would.

mod supabase;

pub use supabase::SupabaseAuth;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use stockcount_core::Email;
use thiserror::Error;
use uuid::Uuid;

/// Seconds before expiry at which a token is already treated as expired.
const EXPIRY_SKEW_SECS: i64 = 60;

/// Errors reported by an [`AuthProvider`].
#[derive(Debug, Error)]
pub enum AuthError {
    /// The provider could not be reached.
    #[error("HTTP error: {0}")]
    Network(#[from] reqwest::Error),

    /// The provider rejected the request.
    #[error("{message}")]
    Provider {
        status: u16,
        /// Machine-readable code such as `invalid_credentials`.
        code: Option<String>,
        message: String,
    },

    /// The provider answered with something we could not read.
    #[error("Invalid auth response: {0}")]
    Decode(String),

    /// The provider URL could not be used.
    #[error("Auth configuration error: {0}")]
    Config(String),
}

impl AuthError {
    /// The provider's machine-readable error code, if any.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Provider { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// Whether the provider refused the credentials or token itself, as
    /// opposed to being unreachable.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(self, Self::Provider { status: 400..=499, .. })
    }
}

/// The authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

/// An authenticated session.
#[derive(Clone, Serialize, Deserialize)]
#[serde(from = "PersistedSession", into = "PersistedSession")]
pub struct Session {
    /// Bearer token for API requests.
    pub access_token: SecretString,
    /// Token used to obtain a new access token.
    pub refresh_token: Option<SecretString>,
    /// Unix timestamp when the access token expires.
    pub expires_at: Option<i64>,
    pub user: User,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

impl Session {
    /// Check if the access token has expired (or will within a minute).
    ///
    /// A session without an expiry never expires locally; the provider
    /// still gets the final say when it is verified.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|expires_at| {
            let now = chrono::Utc::now().timestamp();
            now >= expires_at - EXPIRY_SKEW_SECS
        })
    }

    /// Check if a refresh token is available.
    #[must_use]
    pub fn can_refresh(&self) -> bool {
        self.refresh_token
            .as_ref()
            .is_some_and(|token| !token.expose_secret().is_empty())
    }
}

/// Serialized form of a [`Session`].
#[derive(Serialize, Deserialize)]
struct PersistedSession {
    access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<i64>,
    user: User,
}

impl From<PersistedSession> for Session {
    fn from(persisted: PersistedSession) -> Self {
        Self {
            access_token: SecretString::from(persisted.access_token),
            refresh_token: persisted.refresh_token.map(SecretString::from),
            expires_at: persisted.expires_at,
            user: persisted.user,
        }
    }
}

impl From<Session> for PersistedSession {
    fn from(session: Session) -> Self {
        Self {
            access_token: session.access_token.expose_secret().to_string(),
            refresh_token: session
                .refresh_token
                .as_ref()
                .map(|token| token.expose_secret().to_string()),
            expires_at: session.expires_at,
            user: session.user,
        }
    }
}

/// Result of a sign-up.
///
/// `session` is `None` while the provider waits for email confirmation.
#[derive(Debug, Clone)]
pub struct AuthResponse {
    pub user: User,
    pub session: Option<Session>,
}

/// A hosted authentication provider.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Exchange email and password for a session.
    async fn sign_in(&self, email: &Email, password: &SecretString) -> Result<Session, AuthError>;

    /// Register a new account.
    ///
    /// An address that is already registered fails with code
    /// `user_already_exists`.
    async fn sign_up(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<AuthResponse, AuthError>;

    /// Revoke the session on the provider side.
    async fn sign_out(&self, session: &Session) -> Result<(), AuthError>;

    /// Bring a persisted session back to life.
    ///
    /// Returns the (possibly refreshed) session, or `None` if it can no
    /// longer be used and the user has to sign in again.
    async fn restore(&self, session: &Session) -> Result<Option<Session>, AuthError>;
}
