//! Inventory record endpoints.
//!
//! Records are addressed by `(period, product)`; the backend keeps at most
//! one per pair and `upsert` both creates and overwrites.

use secrecy::SecretString;
use stockcount_core::{
    CurrentInventory, InventoryRecord, ItemPayload, ListPayload, PeriodId, ProductId,
    UpsertRecordInput,
};
use tracing::instrument;

use super::{ApiClient, ApiError, ApiRequest};

impl ApiClient {
    /// All records counted in a period.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self, token), fields(period_id = %period))]
    pub async fn list_records(
        &self,
        token: &SecretString,
        period: PeriodId,
    ) -> Result<Vec<InventoryRecord>, ApiError> {
        let path = format!("/inventory/periods/{period}/records");
        let payload: Option<ListPayload<InventoryRecord>> =
            self.send(&path, Some(token), ApiRequest::get()).await?;
        Ok(payload.unwrap_or_default().into_items())
    }

    /// The record for one product in one period.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails or the body is empty.
    #[instrument(skip(self, token), fields(period_id = %period, product_id = %product))]
    pub async fn get_record(
        &self,
        token: &SecretString,
        period: PeriodId,
        product: ProductId,
    ) -> Result<InventoryRecord, ApiError> {
        let path = format!("/inventory/periods/{period}/records/{product}");
        let payload: ItemPayload<InventoryRecord> =
            self.fetch(&path, Some(token), ApiRequest::get()).await?;
        Ok(payload.into_inner())
    }

    /// Create or overwrite the record for `input.product_id`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails or the body is empty.
    #[instrument(
        skip(self, token, input),
        fields(period_id = %period, product_id = %input.product_id, quantity = input.quantity)
    )]
    pub async fn upsert_record(
        &self,
        token: &SecretString,
        period: PeriodId,
        input: &UpsertRecordInput,
    ) -> Result<InventoryRecord, ApiError> {
        let path = format!("/inventory/periods/{period}/records");
        let payload: ItemPayload<InventoryRecord> = self
            .fetch(&path, Some(token), ApiRequest::post().json(input)?)
            .await?;
        Ok(payload.into_inner())
    }

    /// Delete the record for one product in one period.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self, token), fields(period_id = %period, product_id = %product))]
    pub async fn delete_record(
        &self,
        token: &SecretString,
        period: PeriodId,
        product: ProductId,
    ) -> Result<(), ApiError> {
        let path = format!("/inventory/periods/{period}/records/{product}");
        self.execute(&path, Some(token), ApiRequest::delete()).await
    }

    /// The active period together with its records.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self, token))]
    pub async fn current_inventory(&self, token: &SecretString) -> Result<CurrentInventory, ApiError> {
        let payload: Option<CurrentInventory> = self
            .send("/inventory/current", Some(token), ApiRequest::get())
            .await?;
        Ok(payload.unwrap_or_default())
    }
}
