//! Cached inventory periods and the active one.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use stockcount_core::{CreatePeriodInput, InventoryPeriod, PeriodId, UpdatePeriodInput};
use tracing::{info, instrument};

use super::{ActionStatus, AuthStore, StoreCell, StoreState, remove_by, replace_by, upsert_front};
use crate::api::ApiClient;
use crate::error::{ClientError, ValidationError};
use crate::storage::{SnapshotStorage, StorageError};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodsState {
    #[serde(default)]
    pub items: Vec<InventoryPeriod>,
    #[serde(default)]
    pub active: Option<InventoryPeriod>,
    #[serde(default)]
    pub status: ActionStatus,
}

impl StoreState for PeriodsState {
    fn status(&self) -> &ActionStatus {
        &self.status
    }

    fn status_mut(&mut self) -> &mut ActionStatus {
        &mut self.status
    }
}

impl PeriodsState {
    fn is_active_id(&self, id: PeriodId) -> bool {
        self.active.as_ref().is_some_and(|active| active.id == id)
    }

    /// Keep `active` in step with a changed period.
    fn track(&mut self, period: &InventoryPeriod) {
        if period.is_active() {
            self.active = Some(period.clone());
        } else if self.is_active_id(period.id) {
            self.active = None;
        }
    }
}

pub struct PeriodStore {
    cell: StoreCell<PeriodsState>,
    api: ApiClient,
    auth: Arc<AuthStore>,
}

impl PeriodStore {
    pub const KEY: &'static str = "periods";

    #[must_use]
    pub fn new(api: ApiClient, auth: Arc<AuthStore>, storage: Arc<dyn SnapshotStorage>) -> Self {
        Self {
            cell: StoreCell::new(Self::KEY, storage),
            api,
            auth,
        }
    }

    pub async fn state(&self) -> PeriodsState {
        self.cell.read(Clone::clone).await
    }

    pub async fn items(&self) -> Vec<InventoryPeriod> {
        self.cell.read(|state| state.items.clone()).await
    }

    pub async fn active(&self) -> Option<InventoryPeriod> {
        self.cell.read(|state| state.active.clone()).await
    }

    pub async fn status(&self) -> ActionStatus {
        self.cell.read(|state| state.status().clone()).await
    }

    /// Load every period, replacing the cache.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Unauthenticated` without a session, or the API
    /// error.
    #[instrument(skip(self))]
    pub async fn fetch_all(&self) -> Result<Vec<InventoryPeriod>, ClientError> {
        let token = self.cell.authorize(&self.auth).await?;
        self.cell.begin().await;
        let result = self.api.list_periods(&token).await;
        self.cell
            .settle("fetch_all", result, |state, periods| {
                state.items.clone_from(periods);
            })
            .await
    }

    /// Ask the backend which period is open for counting.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Unauthenticated` without a session, or the API
    /// error.
    #[instrument(skip(self))]
    pub async fn fetch_active(&self) -> Result<Option<InventoryPeriod>, ClientError> {
        let token = self.cell.authorize(&self.auth).await?;
        self.cell.begin().await;
        let result = self.api.active_period(&token).await;
        self.cell
            .settle("fetch_active", result, |state, active| {
                state.active.clone_from(active);
                if let Some(period) = active {
                    replace_by(&mut state.items, period.clone(), |p| p.id);
                }
            })
            .await
    }

    /// Open a new period.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` for an empty name, or the API error.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create(&self, input: CreatePeriodInput) -> Result<InventoryPeriod, ClientError> {
        let token = self.cell.authorize(&self.auth).await?;
        if input.name.trim().is_empty() {
            return self
                .cell
                .reject(ValidationError::Required { field: "name" }.into())
                .await;
        }

        self.cell.begin().await;
        let result = self.api.create_period(&token, &input).await;
        let created = self
            .cell
            .settle("create", result, |state, created| {
                upsert_front(&mut state.items, created.clone(), |p| p.id);
                // Opening a period makes it the one being counted
                state.active = Some(created.clone());
            })
            .await?;
        info!(period_id = %created.id, "period created");
        Ok(created)
    }

    /// Update a period, merging the patch locally when the backend sends no
    /// body back.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Unauthenticated` without a session, or the API
    /// error.
    #[instrument(skip(self, patch), fields(period_id = %id))]
    pub async fn update(
        &self,
        id: PeriodId,
        patch: UpdatePeriodInput,
    ) -> Result<Option<InventoryPeriod>, ClientError> {
        let token = self.cell.authorize(&self.auth).await?;
        self.cell.begin().await;
        let result = self.api.update_period(&token, id, &patch).await;
        self.cell
            .settle("update", result, |state, updated| {
                let merged = match updated {
                    Some(period) => {
                        replace_by(&mut state.items, period.clone(), |p| p.id);
                        Some(period.clone())
                    }
                    None => state.items.iter_mut().find(|p| p.id == id).map(|period| {
                        period.apply(&patch);
                        period.clone()
                    }),
                };
                match merged {
                    Some(period) => state.track(&period),
                    None => {
                        if let Some(active) = state.active.as_mut().filter(|a| a.id == id) {
                            active.apply(&patch);
                        }
                    }
                }
            })
            .await
    }

    /// Close a period for counting.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Unauthenticated` without a session, or the API
    /// error.
    #[instrument(skip(self), fields(period_id = %id))]
    pub async fn close(&self, id: PeriodId) -> Result<Option<InventoryPeriod>, ClientError> {
        let token = self.cell.authorize(&self.auth).await?;
        self.cell.begin().await;
        let result = self.api.close_period(&token, id).await;
        let closed = self
            .cell
            .settle("close", result, |state, closed| {
                match closed {
                    Some(period) => {
                        replace_by(&mut state.items, period.clone(), |p| p.id);
                    }
                    None => {
                        if let Some(period) = state.items.iter_mut().find(|p| p.id == id) {
                            period.mark_closed();
                        }
                    }
                }
                if state.is_active_id(id) {
                    state.active = None;
                }
            })
            .await?;
        info!(period_id = %id, "period closed");
        match closed {
            Some(period) => Ok(Some(period)),
            None => Ok(self
                .cell
                .read(|state| state.items.iter().find(|p| p.id == id).cloned())
                .await),
        }
    }

    /// Delete a period.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Unauthenticated` without a session, or the API
    /// error.
    #[instrument(skip(self), fields(period_id = %id))]
    pub async fn delete(&self, id: PeriodId) -> Result<(), ClientError> {
        let token = self.cell.authorize(&self.auth).await?;
        self.cell.begin().await;
        let result = self.api.delete_period(&token, id).await;
        self.cell
            .settle("delete", result, |state, _| {
                remove_by(&mut state.items, &id, |p| p.id);
                if state.is_active_id(id) {
                    state.active = None;
                }
            })
            .await
    }

    pub(crate) async fn rehydrate(&self) -> Result<(), StorageError> {
        self.cell.rehydrate().await
    }

    pub(crate) async fn flush(&self) -> Result<(), StorageError> {
        self.cell.flush().await
    }

    pub(crate) async fn clear(&self) {
        self.cell.clear().await;
    }
}
