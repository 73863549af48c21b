//! Session state.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use stockcount_core::Email;
use tracing::{info, instrument, warn};

use super::{ActionStatus, StoreCell, StoreState};
use crate::auth::{AuthProvider, Session, User};
use crate::error::{ClientError, ValidationError};
use crate::storage::{SnapshotStorage, StorageError};

/// Persisted session state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthState {
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub session: Option<Session>,
    #[serde(default)]
    pub status: ActionStatus,
}

impl StoreState for AuthState {
    fn status(&self) -> &ActionStatus {
        &self.status
    }

    fn status_mut(&mut self) -> &mut ActionStatus {
        &mut self.status
    }
}

/// Holds the session and talks to the auth provider.
///
/// `Anonymous -> Authenticated` on sign-in, sign-up with an immediate
/// session, or restore; back to `Anonymous` on sign-out or a failed restore.
pub struct AuthStore {
    cell: StoreCell<AuthState>,
    provider: Arc<dyn AuthProvider>,
}

impl AuthStore {
    pub const KEY: &'static str = "auth";

    #[must_use]
    pub fn new(provider: Arc<dyn AuthProvider>, storage: Arc<dyn SnapshotStorage>) -> Self {
        Self {
            cell: StoreCell::new(Self::KEY, storage),
            provider,
        }
    }

    /// Bearer token of the current session.
    pub async fn token(&self) -> Option<SecretString> {
        self.cell
            .read(|state| state.session.as_ref().map(|s| s.access_token.clone()))
            .await
    }

    pub async fn is_authenticated(&self) -> bool {
        self.cell.read(|state| state.session.is_some()).await
    }

    pub async fn user(&self) -> Option<User> {
        self.cell.read(|state| state.user.clone()).await
    }

    pub async fn session(&self) -> Option<Session> {
        self.cell.read(|state| state.session.clone()).await
    }

    /// Copy of the full state.
    pub async fn state(&self) -> AuthState {
        self.cell.read(Clone::clone).await
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` for a malformed email or empty
    /// password, `ClientError::Auth` if the provider refuses.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<User, ClientError> {
        let email = self.credentials(email, password).await?;
        self.cell.begin().await;
        let result = self.provider.sign_in(&email, password).await;
        let session = self
            .cell
            .settle("login", result, |state, session| {
                state.user = Some(session.user.clone());
                state.session = Some(session.clone());
            })
            .await?;
        info!(user_id = %session.user.id, "logged in");
        Ok(session.user)
    }

    /// Register a new account.
    ///
    /// Returns `true` if the provider issued a session right away, `false`
    /// if the address still has to be confirmed.
    ///
    /// # Errors
    ///
    /// Same as [`login`](Self::login); an existing address fails with code
    /// `user_already_exists`.
    #[instrument(skip(self, password))]
    pub async fn signup(&self, email: &str, password: &SecretString) -> Result<bool, ClientError> {
        let email = self.credentials(email, password).await?;
        self.cell.begin().await;
        let result = self.provider.sign_up(&email, password).await;
        let response = self
            .cell
            .settle("signup", result, |state, response| {
                state.user = Some(response.user.clone());
                state.session.clone_from(&response.session);
            })
            .await?;
        Ok(response.session.is_some())
    }

    /// Sign out. Local state is cleared even if the provider call fails.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        if let Some(session) = self.session().await
            && let Err(e) = self.provider.sign_out(&session).await
        {
            warn!(error = %e, "provider sign-out failed, clearing local session anyway");
        }
        self.cell.clear().await;
        info!("logged out");
    }

    /// Bring the persisted session back, refreshing it if needed.
    ///
    /// Returns whether a usable session is held afterwards. If the provider
    /// cannot be reached the persisted session is kept.
    #[instrument(skip(self))]
    pub async fn restore(&self) -> bool {
        let Some(session) = self.session().await else {
            return false;
        };

        match self.provider.restore(&session).await {
            Ok(Some(restored)) => {
                let refreshed =
                    restored.access_token.expose_secret() != session.access_token.expose_secret();
                self.cell
                    .update(|state| {
                        state.user = Some(restored.user.clone());
                        state.session = Some(restored);
                    })
                    .await;
                info!(refreshed, "session restored");
                true
            }
            Ok(None) => {
                info!("stored session is no longer valid");
                self.cell.clear().await;
                false
            }
            Err(e) => {
                warn!(error = %e, "could not verify stored session, keeping it");
                true
            }
        }
    }

    /// Restore the session only if its access token has expired.
    ///
    /// Returns whether a session is held afterwards. A live session is
    /// used as-is without asking the provider.
    #[instrument(skip(self))]
    pub async fn refresh_if_expired(&self) -> bool {
        match self.session().await {
            Some(session) if session.is_expired() => self.restore().await,
            Some(_) => true,
            None => false,
        }
    }

    pub(crate) async fn rehydrate(&self) -> Result<(), StorageError> {
        self.cell.rehydrate().await
    }

    pub(crate) async fn flush(&self) -> Result<(), StorageError> {
        self.cell.flush().await
    }

    async fn credentials(&self, email: &str, password: &SecretString) -> Result<Email, ClientError> {
        let email = match Email::parse(email) {
            Ok(email) => email,
            Err(e) => return self.cell.reject(ValidationError::from(e).into()).await,
        };
        if password.expose_secret().is_empty() {
            return self
                .cell
                .reject(ValidationError::Required { field: "password" }.into())
                .await;
        }
        Ok(email)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use uuid::Uuid;

    use super::*;
    use crate::auth::{AuthError, AuthResponse};
    use crate::storage::MemoryStorage;

    /// Provider that answers from fixed outcomes and counts calls.
    #[derive(Default)]
    struct FakeProvider {
        reject: bool,
        restore_outcome: Mutex<Option<Result<Option<Session>, AuthError>>>,
        calls: Mutex<Vec<&'static str>>,
    }

    fn session(token: &str) -> Session {
        Session {
            access_token: SecretString::from(token.to_string()),
            refresh_token: None,
            expires_at: None,
            user: User {
                id: Uuid::nil(),
                email: Some("clerk@example.com".to_string()),
            },
        }
    }

    impl FakeProvider {
        fn record(&self, call: &'static str) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl AuthProvider for FakeProvider {
        async fn sign_in(&self, _: &Email, _: &SecretString) -> Result<Session, AuthError> {
            self.record("sign_in");
            if self.reject {
                return Err(AuthError::Provider {
                    status: 400,
                    code: Some("invalid_credentials".to_string()),
                    message: "Invalid login credentials".to_string(),
                });
            }
            Ok(session("fresh"))
        }

        async fn sign_up(&self, _: &Email, _: &SecretString) -> Result<AuthResponse, AuthError> {
            self.record("sign_up");
            Ok(AuthResponse {
                user: session("x").user,
                session: None,
            })
        }

        async fn sign_out(&self, _: &Session) -> Result<(), AuthError> {
            self.record("sign_out");
            Err(AuthError::Decode("provider down".to_string()))
        }

        async fn restore(&self, _: &Session) -> Result<Option<Session>, AuthError> {
            self.record("restore");
            self.restore_outcome.lock().unwrap().take().unwrap_or(Ok(None))
        }
    }

    fn setup(provider: FakeProvider) -> (AuthStore, Arc<FakeProvider>, Arc<MemoryStorage>) {
        let provider = Arc::new(provider);
        let storage = Arc::new(MemoryStorage::new());
        let store = AuthStore::new(provider.clone(), storage.clone());
        (store, provider, storage)
    }

    #[tokio::test]
    async fn test_login_stores_session_and_persists() {
        let (store, _, storage) = setup(FakeProvider::default());
        store
            .login(" Clerk@Example.com ", &SecretString::from("pw"))
            .await
            .unwrap();

        assert!(store.is_authenticated().await);
        assert_eq!(store.token().await.unwrap().expose_secret(), "fresh");
        let snapshot = storage.load("auth").await.unwrap().unwrap();
        assert_eq!(snapshot["session"]["access_token"], "fresh");
    }

    #[tokio::test]
    async fn test_login_failure_records_error() {
        let (store, _, _) = setup(FakeProvider {
            reject: true,
            ..Default::default()
        });
        let err = store
            .login("clerk@example.com", &SecretString::from("pw"))
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "Email o contraseña incorrectos.");

        let state = store.state().await;
        assert!(!state.status.loading);
        assert_eq!(state.status.error.as_deref(), Some("Invalid login credentials"));
        assert!(state.session.is_none());
    }

    #[tokio::test]
    async fn test_login_validates_before_calling_provider() {
        let (store, provider, _) = setup(FakeProvider::default());
        let err = store
            .login("not-an-email", &SecretString::from("pw"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Validation(ValidationError::InvalidEmail(_))));

        let err = store
            .login("clerk@example.com", &SecretString::from(""))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Validation(ValidationError::Required { .. })));
        assert!(provider.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_signup_pending_confirmation_stays_anonymous() {
        let (store, _, _) = setup(FakeProvider::default());
        let has_session = store
            .signup("new@example.com", &SecretString::from("pw"))
            .await
            .unwrap();
        assert!(!has_session);
        assert!(!store.is_authenticated().await);
        assert!(store.user().await.is_some());
    }

    #[tokio::test]
    async fn test_logout_clears_even_when_provider_fails() {
        let (store, provider, _) = setup(FakeProvider::default());
        store
            .login("clerk@example.com", &SecretString::from("pw"))
            .await
            .unwrap();
        store.logout().await;

        assert!(!store.is_authenticated().await);
        assert!(store.user().await.is_none());
        assert_eq!(*provider.calls.lock().unwrap(), vec!["sign_in", "sign_out"]);
    }

    #[tokio::test]
    async fn test_restore_outcomes() {
        // No session: provider never asked
        let (store, provider, _) = setup(FakeProvider::default());
        assert!(!store.restore().await);
        assert!(provider.calls.lock().unwrap().is_empty());

        // Refreshed session replaces the stored one
        let (store, provider, storage) = setup(FakeProvider::default());
        storage
            .save(
                "auth",
                &serde_json::to_value(AuthState {
                    session: Some(session("old")),
                    ..Default::default()
                })
                .unwrap(),
            )
            .await
            .unwrap();
        store.rehydrate().await.unwrap();
        *provider.restore_outcome.lock().unwrap() = Some(Ok(Some(session("new"))));
        assert!(store.restore().await);
        assert_eq!(store.token().await.unwrap().expose_secret(), "new");

        // Provider unreachable: keep what we have
        *provider.restore_outcome.lock().unwrap() =
            Some(Err(AuthError::Decode("unreachable".to_string())));
        assert!(store.restore().await);
        assert_eq!(store.token().await.unwrap().expose_secret(), "new");

        // Invalid session: anonymous
        assert!(!store.restore().await);
        assert!(!store.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_refresh_only_when_expired() {
        let (store, provider, storage) = setup(FakeProvider::default());
        assert!(!store.refresh_if_expired().await);

        let live = session("live");
        storage
            .save(
                "auth",
                &serde_json::to_value(AuthState {
                    session: Some(live),
                    ..Default::default()
                })
                .unwrap(),
            )
            .await
            .unwrap();
        store.rehydrate().await.unwrap();
        assert!(store.refresh_if_expired().await);
        assert!(provider.calls.lock().unwrap().is_empty());

        let expired = Session {
            expires_at: Some(chrono::Utc::now().timestamp() - 10),
            ..session("stale")
        };
        storage
            .save(
                "auth",
                &serde_json::to_value(AuthState {
                    session: Some(expired),
                    ..Default::default()
                })
                .unwrap(),
            )
            .await
            .unwrap();
        store.rehydrate().await.unwrap();
        *provider.restore_outcome.lock().unwrap() = Some(Ok(Some(session("renewed"))));
        assert!(store.refresh_if_expired().await);
        assert_eq!(*provider.calls.lock().unwrap(), vec!["restore"]);
        assert_eq!(store.token().await.unwrap().expose_secret(), "renewed");
    }
}
