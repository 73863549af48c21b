//! Application context: owns the clients, storage and stores.
//!
//! Lifecycle:
//!
//! 1. [`AppContext::init`] rehydrates every store from its snapshot,
//!    restores the session and, when signed in, runs the bootstrap fetches.
//! 2. Store actions are called through the accessors.
//! 3. [`AppContext::teardown`] flushes every snapshot.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::api::ApiClient;
use crate::auth::{AuthProvider, SupabaseAuth};
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::storage::{FileStorage, SnapshotStorage, StorageError};
use crate::store::{AuthStore, CategoryStore, PeriodStore, ProductStore, RecordStore};

const DEFAULT_PAGE_SIZE: u32 = 20;

/// Outcome of each bootstrap fetch. `None` means the fetch succeeded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootstrapReport {
    /// Whether a session was available, i.e. the fetches ran at all.
    pub authenticated: bool,
    pub categories: Option<String>,
    pub active_period: Option<String>,
    pub products: Option<String>,
    pub current_records: Option<String>,
}

impl BootstrapReport {
    /// Signed in and every fetch succeeded.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.authenticated
            && self.categories.is_none()
            && self.active_period.is_none()
            && self.products.is_none()
            && self.current_records.is_none()
    }

    /// `(fetch, message)` for every failed fetch.
    #[must_use]
    pub fn failures(&self) -> Vec<(&'static str, &str)> {
        [
            ("categories", &self.categories),
            ("active_period", &self.active_period),
            ("products", &self.products),
            ("current_records", &self.current_records),
        ]
        .into_iter()
        .filter_map(|(name, error)| error.as_deref().map(|message| (name, message)))
        .collect()
    }
}

fn outcome<T>(result: Result<T, ClientError>) -> Option<String> {
    result.err().map(|e| e.user_message())
}

/// Everything a front end needs, wired together.
pub struct AppContext {
    api: ApiClient,
    storage: Arc<dyn SnapshotStorage>,
    page_size: u32,
    auth: Arc<AuthStore>,
    categories: CategoryStore,
    products: ProductStore,
    periods: PeriodStore,
    records: RecordStore,
}

impl AppContext {
    /// Wire the context from configuration: file snapshots under
    /// `state_dir` and the hosted auth provider.
    ///
    /// # Errors
    ///
    /// Returns an error if either HTTP client cannot be built.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        let api = ApiClient::new(&config.api)?;
        let provider = Arc::new(SupabaseAuth::new(&config.auth)?);
        let storage = Arc::new(FileStorage::new(config.state_dir.clone()));
        Ok(Self::new(api, provider, storage, config.page_size))
    }

    /// Wire the context from parts.
    #[must_use]
    pub fn new(
        api: ApiClient,
        provider: Arc<dyn AuthProvider>,
        storage: Arc<dyn SnapshotStorage>,
        page_size: u32,
    ) -> Self {
        let auth = Arc::new(AuthStore::new(provider, storage.clone()));
        Self {
            categories: CategoryStore::new(api.clone(), auth.clone(), storage.clone()),
            products: ProductStore::new(api.clone(), auth.clone(), storage.clone()),
            periods: PeriodStore::new(api.clone(), auth.clone(), storage.clone()),
            records: RecordStore::new(api.clone(), auth.clone(), storage.clone()),
            api,
            storage,
            page_size: if page_size == 0 { DEFAULT_PAGE_SIZE } else { page_size },
            auth,
        }
    }

    /// Rehydrate, restore the session and bootstrap.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if a snapshot file cannot be read. Corrupt
    /// snapshots are discarded, not reported.
    #[instrument(skip(self))]
    pub async fn init(&self) -> Result<BootstrapReport, StorageError> {
        self.rehydrate().await?;
        if !self.auth.restore().await {
            info!("no session, skipping bootstrap");
            return Ok(BootstrapReport::default());
        }
        Ok(self.bootstrap().await)
    }

    /// Load every store's snapshot without touching the network.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if a snapshot file cannot be read. Corrupt
    /// snapshots are discarded, not reported.
    #[instrument(skip(self))]
    pub async fn rehydrate(&self) -> Result<(), StorageError> {
        self.auth.rehydrate().await?;
        self.categories.rehydrate().await?;
        self.products.rehydrate().await?;
        self.periods.rehydrate().await?;
        self.records.rehydrate().await
    }

    /// Run the four startup fetches concurrently and wait for all of them.
    /// One failure does not stop the others.
    #[instrument(skip(self))]
    pub async fn bootstrap(&self) -> BootstrapReport {
        let (categories, active_period, products, current_records) = tokio::join!(
            self.categories.fetch_all(1, self.page_size),
            self.periods.fetch_active(),
            self.products.fetch_all(1, self.page_size),
            self.records.fetch_current(),
        );

        let report = BootstrapReport {
            authenticated: true,
            categories: outcome(categories),
            active_period: outcome(active_period),
            products: outcome(products),
            current_records: outcome(current_records),
        };
        for (fetch, error) in report.failures() {
            warn!(fetch, error, "bootstrap fetch failed");
        }
        info!(complete = report.is_complete(), "bootstrap finished");
        report
    }

    /// Sign out and drop every cached entity.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) {
        self.auth.logout().await;
        self.categories.clear().await;
        self.products.clear().await;
        self.periods.clear().await;
        self.records.clear().await;
    }

    /// Write every store's snapshot.
    ///
    /// # Errors
    ///
    /// Returns the first storage failure; the remaining stores are still
    /// flushed.
    #[instrument(skip(self))]
    pub async fn teardown(&self) -> Result<(), StorageError> {
        let results = [
            self.auth.flush().await,
            self.categories.flush().await,
            self.products.flush().await,
            self.periods.flush().await,
            self.records.flush().await,
        ];
        results.into_iter().collect()
    }

    #[must_use]
    pub const fn api(&self) -> &ApiClient {
        &self.api
    }

    #[must_use]
    pub fn storage(&self) -> &Arc<dyn SnapshotStorage> {
        &self.storage
    }

    #[must_use]
    pub const fn page_size(&self) -> u32 {
        self.page_size
    }

    #[must_use]
    pub fn auth(&self) -> &AuthStore {
        &self.auth
    }

    #[must_use]
    pub const fn categories(&self) -> &CategoryStore {
        &self.categories
    }

    #[must_use]
    pub const fn products(&self) -> &ProductStore {
        &self.products
    }

    #[must_use]
    pub const fn periods(&self) -> &PeriodStore {
        &self.periods
    }

    #[must_use]
    pub const fn records(&self) -> &RecordStore {
        &self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_failures() {
        let report = BootstrapReport {
            authenticated: true,
            products: Some("Error de conexión. Verifica tu internet.".to_string()),
            ..Default::default()
        };
        assert!(!report.is_complete());
        assert_eq!(
            report.failures(),
            vec![("products", "Error de conexión. Verifica tu internet.")]
        );

        let anonymous = BootstrapReport::default();
        assert!(!anonymous.is_complete());
        assert!(anonymous.failures().is_empty());
    }
}
