//! Cached inventory records, grouped by period.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use stockcount_core::{
    CurrentInventory, InventoryPeriod, InventoryRecord, PeriodId, ProductId, UpsertRecordInput,
};
use tracing::instrument;

use super::{ActionStatus, AuthStore, StoreCell, StoreState, remove_by, replace_by};
use crate::api::ApiClient;
use crate::error::ClientError;
use crate::storage::{SnapshotStorage, StorageError};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordsState {
    /// Records per period, in the order the backend returned them.
    #[serde(default)]
    pub by_period: BTreeMap<PeriodId, Vec<InventoryRecord>>,
    /// Period reported by the last `fetch_current`.
    #[serde(default)]
    pub current_period: Option<InventoryPeriod>,
    #[serde(default)]
    pub status: ActionStatus,
}

impl StoreState for RecordsState {
    fn status(&self) -> &ActionStatus {
        &self.status
    }

    fn status_mut(&mut self) -> &mut ActionStatus {
        &mut self.status
    }
}

impl RecordsState {
    /// Put `record` in its period's list, replacing the entry for the same
    /// product.
    fn upsert(&mut self, period: PeriodId, record: InventoryRecord) {
        let records = self.by_period.entry(period).or_default();
        if !replace_by(records, record.clone(), |r| r.product_id) {
            records.insert(0, record);
        }
    }
}

pub struct RecordStore {
    cell: StoreCell<RecordsState>,
    api: ApiClient,
    auth: Arc<AuthStore>,
}

impl RecordStore {
    pub const KEY: &'static str = "records";

    #[must_use]
    pub fn new(api: ApiClient, auth: Arc<AuthStore>, storage: Arc<dyn SnapshotStorage>) -> Self {
        Self {
            cell: StoreCell::new(Self::KEY, storage),
            api,
            auth,
        }
    }

    pub async fn state(&self) -> RecordsState {
        self.cell.read(Clone::clone).await
    }

    /// Cached records for one period.
    pub async fn records_for(&self, period: PeriodId) -> Vec<InventoryRecord> {
        self.cell
            .read(|state| state.by_period.get(&period).cloned().unwrap_or_default())
            .await
    }

    pub async fn current_period(&self) -> Option<InventoryPeriod> {
        self.cell.read(|state| state.current_period.clone()).await
    }

    pub async fn status(&self) -> ActionStatus {
        self.cell.read(|state| state.status().clone()).await
    }

    /// Load every record of a period, replacing that period's cache.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Unauthenticated` without a session, or the API
    /// error.
    #[instrument(skip(self), fields(period_id = %period))]
    pub async fn fetch_by_period(
        &self,
        period: PeriodId,
    ) -> Result<Vec<InventoryRecord>, ClientError> {
        let token = self.cell.authorize(&self.auth).await?;
        self.cell.begin().await;
        let result = self.api.list_records(&token, period).await;
        self.cell
            .settle("fetch_by_period", result, |state, records| {
                state.by_period.insert(period, records.clone());
            })
            .await
    }

    /// Load the active period together with its records.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Unauthenticated` without a session, or the API
    /// error.
    #[instrument(skip(self))]
    pub async fn fetch_current(&self) -> Result<CurrentInventory, ClientError> {
        let token = self.cell.authorize(&self.auth).await?;
        self.cell.begin().await;
        let result = self.api.current_inventory(&token).await;
        self.cell
            .settle("fetch_current", result, |state, current| {
                state.current_period.clone_from(&current.period);
                if let Some(period) = &current.period {
                    state.by_period.insert(period.id, current.records.clone());
                }
            })
            .await
    }

    /// Record a count. The backend keeps one record per product and period.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Unauthenticated` without a session, or the API
    /// error.
    #[instrument(skip(self, input), fields(period_id = %period, product_id = %input.product_id))]
    pub async fn upsert(
        &self,
        period: PeriodId,
        input: UpsertRecordInput,
    ) -> Result<InventoryRecord, ClientError> {
        let token = self.cell.authorize(&self.auth).await?;
        self.cell.begin().await;
        let result = self.api.upsert_record(&token, period, &input).await;
        self.cell
            .settle("upsert", result, |state, record| {
                state.upsert(period, record.clone());
            })
            .await
    }

    /// Delete one product's record in a period.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Unauthenticated` without a session, or the API
    /// error.
    #[instrument(skip(self), fields(period_id = %period, product_id = %product))]
    pub async fn delete(&self, period: PeriodId, product: ProductId) -> Result<(), ClientError> {
        let token = self.cell.authorize(&self.auth).await?;
        self.cell.begin().await;
        let result = self.api.delete_record(&token, period, product).await;
        self.cell
            .settle("delete", result, |state, _| {
                if let Some(records) = state.by_period.get_mut(&period) {
                    remove_by(records, &product, |r| r.product_id);
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
