//! Inventory period endpoints.

use secrecy::SecretString;
use serde::Deserialize;
use stockcount_core::{
    CreatePeriodInput, InventoryPeriod, ItemPayload, ListPayload, PeriodId, UpdatePeriodInput,
};
use tracing::instrument;

use super::{ApiClient, ApiError, ApiRequest};

/// Response of the active-period endpoint: `null`, a period, or either one
/// inside `{ "data": ... }`.
///
/// The bare form is tried first; a missing `data` member would otherwise
/// read as `data: null` and swallow a bare period.
#[derive(Deserialize)]
#[serde(untagged)]
enum ActivePeriod {
    Bare(Option<InventoryPeriod>),
    Wrapped { data: Option<InventoryPeriod> },
}

impl ApiClient {
    /// List all periods.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self, token))]
    pub async fn list_periods(&self, token: &SecretString) -> Result<Vec<InventoryPeriod>, ApiError> {
        let payload: Option<ListPayload<InventoryPeriod>> = self
            .send("/inventory/periods", Some(token), ApiRequest::get())
            .await?;
        Ok(payload.unwrap_or_default().into_items())
    }

    /// The currently active period, if there is one.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self, token))]
    pub async fn active_period(
        &self,
        token: &SecretString,
    ) -> Result<Option<InventoryPeriod>, ApiError> {
        let payload: Option<ActivePeriod> = self
            .send("/inventory/periods/active", Some(token), ApiRequest::get())
            .await?;
        Ok(payload.and_then(|active| match active {
            ActivePeriod::Bare(period) | ActivePeriod::Wrapped { data: period } => period,
        }))
    }

    /// Get a single period.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails or the body is empty.
    #[instrument(skip(self, token), fields(period_id = %id))]
    pub async fn get_period(
        &self,
        token: &SecretString,
        id: PeriodId,
    ) -> Result<InventoryPeriod, ApiError> {
        let path = format!("/inventory/periods/{id}");
        let payload: ItemPayload<InventoryPeriod> =
            self.fetch(&path, Some(token), ApiRequest::get()).await?;
        Ok(payload.into_inner())
    }

    /// Open a new period.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails or the body is empty.
    #[instrument(skip(self, token, input), fields(name = %input.name))]
    pub async fn create_period(
        &self,
        token: &SecretString,
        input: &CreatePeriodInput,
    ) -> Result<InventoryPeriod, ApiError> {
        let payload: ItemPayload<InventoryPeriod> = self
            .fetch("/inventory/periods", Some(token), ApiRequest::post().json(input)?)
            .await?;
        Ok(payload.into_inner())
    }

    /// Update a period.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self, token, input), fields(period_id = %id))]
    pub async fn update_period(
        &self,
        token: &SecretString,
        id: PeriodId,
        input: &UpdatePeriodInput,
    ) -> Result<Option<InventoryPeriod>, ApiError> {
        let path = format!("/inventory/periods/{id}");
        let payload: Option<ItemPayload<InventoryPeriod>> = self
            .send(&path, Some(token), ApiRequest::put().json(input)?)
            .await?;
        Ok(payload.map(ItemPayload::into_inner))
    }

    /// Delete a period.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self, token), fields(period_id = %id))]
    pub async fn delete_period(&self, token: &SecretString, id: PeriodId) -> Result<(), ApiError> {
        let path = format!("/inventory/periods/{id}");
        self.execute(&path, Some(token), ApiRequest::delete()).await
    }

    /// Close a period. The backend may answer with the closed period or
    /// nothing at all.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self, token), fields(period_id = %id))]
    pub async fn close_period(
        &self,
        token: &SecretString,
        id: PeriodId,
    ) -> Result<Option<InventoryPeriod>, ApiError> {
        let path = format!("/inventory/periods/{id}/close");
        let payload: Option<ItemPayload<InventoryPeriod>> =
            self.send(&path, Some(token), ApiRequest::post()).await?;
        Ok(payload.map(ItemPayload::into_inner))
    }
}
