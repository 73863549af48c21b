//! Integration tests for stockcount.
//!
//! Every test runs the client against a `wiremock` server standing in for
//! the inventory backend, with a fixed-session auth provider and in-memory
//! snapshots.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p stockcount-integration-tests
//! ```

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::SecretString;
use stockcount_client::auth::AuthResponse;
use stockcount_client::config::ApiConfig;
use stockcount_client::{
    ApiClient, AppContext, AuthError, AuthProvider, MemoryStorage, Session, SnapshotStorage, User,
};
use stockcount_core::Email;
use url::Url;
use uuid::Uuid;
use wiremock::MockServer;

/// Bearer token issued by [`StaticAuth`].
pub const TOKEN: &str = "test-access-token";

/// Auth provider that signs everyone in with [`TOKEN`] and keeps any stored
/// session valid.
#[derive(Debug, Default)]
pub struct StaticAuth;

/// The session [`StaticAuth`] hands out.
pub fn session() -> Session {
    Session {
        access_token: SecretString::from(TOKEN),
        refresh_token: Some(SecretString::from("test-refresh-token")),
        expires_at: None,
        user: User {
            id: Uuid::nil(),
            email: Some("clerk@example.com".to_string()),
        },
    }
}

#[async_trait]
impl AuthProvider for StaticAuth {
    async fn sign_in(&self, _: &Email, _: &SecretString) -> Result<Session, AuthError> {
        Ok(session())
    }

    async fn sign_up(&self, _: &Email, _: &SecretString) -> Result<AuthResponse, AuthError> {
        let session = session();
        Ok(AuthResponse {
            user: session.user.clone(),
            session: Some(session),
        })
    }

    async fn sign_out(&self, _: &Session) -> Result<(), AuthError> {
        Ok(())
    }

    async fn restore(&self, session: &Session) -> Result<Option<Session>, AuthError> {
        Ok(Some(session.clone()))
    }
}

/// A mock backend plus a context wired to it.
pub struct TestContext {
    pub server: MockServer,
    pub storage: Arc<MemoryStorage>,
    pub ctx: AppContext,
}

impl TestContext {
    /// A context with no session.
    pub async fn anonymous() -> Self {
        let server = MockServer::start().await;
        let storage = Arc::new(MemoryStorage::new());
        let ctx = context_for(&server, storage.clone());
        Self {
            server,
            storage,
            ctx,
        }
    }

    /// A context that is already signed in.
    pub async fn signed_in() -> Self {
        let test = Self::anonymous().await;
        test.ctx
            .auth()
            .login("clerk@example.com", &SecretString::from("secret"))
            .await
            .unwrap();
        test
    }

    /// A second context over the same backend and snapshots, as after a
    /// restart.
    pub fn reopen(&self) -> AppContext {
        context_for(&self.server, self.storage.clone())
    }
}

/// Build a context against `server`, persisting into `storage`.
pub fn context_for(server: &MockServer, storage: Arc<dyn SnapshotStorage>) -> AppContext {
    let base_url = Url::parse(&server.uri()).unwrap();
    let api = ApiClient::new(&ApiConfig::new(base_url)).unwrap();
    AppContext::new(api, Arc::new(StaticAuth), storage, 20)
}

/// `Authorization` header value for [`TOKEN`].
pub fn bearer() -> String {
    format!("Bearer {TOKEN}")
}
