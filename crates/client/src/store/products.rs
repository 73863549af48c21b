//! Cached products and their images.
//!
//! Creating or updating a product can carry an image. The image call runs
//! after the product call has already been committed to the cache; if it
//! fails the product stays, the failure is logged and kept in
//! `image_error`, and the action still succeeds. A create or update that
//! carries no image clears any earlier `image_error`.

use std::sync::Arc;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use stockcount_core::{
    CreateProductInput, ImageId, PageInfo, Product, ProductHistory, ProductId, UpdateProductInput,
};
use tracing::{instrument, warn};

use super::{ActionStatus, AuthStore, StoreCell, StoreState, remove_by, replace_by, upsert_front};
use crate::api::{ApiClient, ApiError, ImageFile, ImageSource};
use crate::error::{ClientError, ValidationError};
use crate::storage::{SnapshotStorage, StorageError};

const DEFAULT_LIMIT: u32 = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductsState {
    #[serde(default)]
    pub items: Vec<Product>,
    pub pagination: PageInfo,
    #[serde(default)]
    pub status: ActionStatus,
    /// An image call is in flight. Never persisted.
    #[serde(skip)]
    pub uploading_image: bool,
    /// Message of the last failed image call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_error: Option<String>,
    /// Last history fetched with [`ProductStore::history`].
    #[serde(skip)]
    pub history: Option<ProductHistory>,
}

impl Default for ProductsState {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            pagination: PageInfo::empty(DEFAULT_LIMIT),
            status: ActionStatus::default(),
            uploading_image: false,
            image_error: None,
            history: None,
        }
    }
}

impl StoreState for ProductsState {
    fn status(&self) -> &ActionStatus {
        &self.status
    }

    fn status_mut(&mut self) -> &mut ActionStatus {
        &mut self.status
    }
}

impl ProductsState {
    fn product_mut(&mut self, id: ProductId) -> Option<&mut Product> {
        self.items.iter_mut().find(|product| product.id == id)
    }
}

pub struct ProductStore {
    cell: StoreCell<ProductsState>,
    api: ApiClient,
    auth: Arc<AuthStore>,
}

impl ProductStore {
    pub const KEY: &'static str = "products";

    #[must_use]
    pub fn new(api: ApiClient, auth: Arc<AuthStore>, storage: Arc<dyn SnapshotStorage>) -> Self {
        Self {
            cell: StoreCell::new(Self::KEY, storage),
            api,
            auth,
        }
    }

    pub async fn state(&self) -> ProductsState {
        self.cell.read(Clone::clone).await
    }

    pub async fn items(&self) -> Vec<Product> {
        self.cell.read(|state| state.items.clone()).await
    }

    pub async fn get(&self, id: ProductId) -> Option<Product> {
        self.cell
            .read(|state| state.items.iter().find(|p| p.id == id).cloned())
            .await
    }

    pub async fn status(&self) -> ActionStatus {
        self.cell.read(|state| state.status().clone()).await
    }

    /// Load one page of products, replacing the cache.
    ///
    /// Pagination fields missing from the response are derived from the
    /// requested page and limit.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Unauthenticated` without a session, or the API
    /// error.
    #[instrument(skip(self))]
    pub async fn fetch_all(&self, page: u32, limit: u32) -> Result<Vec<Product>, ClientError> {
        let token = self.cell.authorize(&self.auth).await?;
        self.cell.begin().await;
        let result = self.api.list_products(&token, page, limit).await;
        let listed = self
            .cell
            .settle("fetch_all", result, |state, listed| {
                state.items.clone_from(&listed.data);
                state.pagination = PageInfo::resolve(listed.pagination.as_ref(), page, limit);
            })
            .await?;
        Ok(listed.data)
    }

    /// Create a product, then attach `image` if one is given.
    ///
    /// Returns the product as cached after the image step.
    ///
    /// # Errors
    ///
    /// Only the product call can fail the action.
    #[instrument(skip(self, input, image), fields(name = %input.name, with_image = image.is_some()))]
    pub async fn create(
        &self,
        input: CreateProductInput,
        image: Option<ImageSource>,
    ) -> Result<Product, ClientError> {
        let token = self.cell.authorize(&self.auth).await?;
        if input.name.trim().is_empty() {
            return self
                .cell
                .reject(ValidationError::Required { field: "name" }.into())
                .await;
        }

        let with_image = image.is_some();
        self.cell.begin().await;
        let result = self.api.create_product(&token, &input).await;
        let created = self
            .cell
            .settle("create", result, |state, created| {
                if upsert_front(&mut state.items, created.clone(), |p| p.id) {
                    state.pagination.record_insert();
                }
                if !with_image {
                    state.image_error = None;
                }
            })
            .await?;

        match image {
            Some(image) => Ok(self
                .attach_best_effort(&token, created.id, image)
                .await
                .unwrap_or(created)),
            None => Ok(created),
        }
    }

    /// Update a product, then attach `image` if one is given.
    ///
    /// # Errors
    ///
    /// Only the product call can fail the action.
    #[instrument(skip(self, patch, image), fields(product_id = %id, with_image = image.is_some()))]
    pub async fn update(
        &self,
        id: ProductId,
        patch: UpdateProductInput,
        image: Option<ImageSource>,
    ) -> Result<Option<Product>, ClientError> {
        let token = self.cell.authorize(&self.auth).await?;
        let with_image = image.is_some();
        self.cell.begin().await;
        let result = self.api.update_product(&token, id, &patch).await;
        self.cell
            .settle("update", result, |state, updated| {
                match updated {
                    Some(product) => {
                        replace_by(&mut state.items, product.clone(), |p| p.id);
                    }
                    None => {
                        if let Some(product) = state.product_mut(id) {
                            product.apply(&patch);
                        }
                    }
                }
                if !with_image {
                    state.image_error = None;
                }
            })
            .await?;

        if let Some(image) = image {
            self.attach_best_effort(&token, id, image).await;
        }
        Ok(self.get(id).await)
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Unauthenticated` without a session, or the API
    /// error.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn delete(&self, id: ProductId) -> Result<(), ClientError> {
        let token = self.cell.authorize(&self.auth).await?;
        self.cell.begin().await;
        let result = self.api.delete_product(&token, id).await;
        self.cell
            .settle("delete", result, |state, _| {
                if remove_by(&mut state.items, &id, |p| p.id) {
                    state.pagination.record_removal();
                }
            })
            .await
    }

    /// Per-period counted quantities for one product.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Unauthenticated` without a session, or the API
    /// error.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn history(&self, id: ProductId) -> Result<ProductHistory, ClientError> {
        let token = self.cell.authorize(&self.auth).await?;
        self.cell.begin().await;
        let result = self.api.product_history(&token, id).await;
        self.cell
            .settle("history", result, |state, history| {
                state.history = Some(history.clone());
            })
            .await
    }

    /// Attach an image by URL.
    ///
    /// # Errors
    ///
    /// Returns the API error; it is also kept in `image_error`.
    #[instrument(skip(self, url), fields(product_id = %id))]
    pub async fn add_image_url(&self, id: ProductId, url: &str) -> Result<Option<Product>, ClientError> {
        let token = self.cell.authorize(&self.auth).await?;
        self.begin_image().await;
        let result = self.api.add_product_image_url(&token, id, url).await;
        self.settle_image(id, result, |_| {}).await
    }

    /// Upload an image file.
    ///
    /// # Errors
    ///
    /// Returns the API error; it is also kept in `image_error`.
    #[instrument(skip(self, file), fields(product_id = %id, file_name = %file.file_name))]
    pub async fn upload_image(
        &self,
        id: ProductId,
        file: ImageFile,
    ) -> Result<Option<Product>, ClientError> {
        let token = self.cell.authorize(&self.auth).await?;
        self.begin_image().await;
        let result = self.api.upload_product_image(&token, id, file).await;
        self.settle_image(id, result, |_| {}).await
    }

    /// Remove one image from a product.
    ///
    /// # Errors
    ///
    /// Returns the API error; it is also kept in `image_error`.
    #[instrument(skip(self), fields(product_id = %id, image_id = %image_id))]
    pub async fn delete_image(
        &self,
        id: ProductId,
        image_id: ImageId,
    ) -> Result<Option<Product>, ClientError> {
        let token = self.cell.authorize(&self.auth).await?;
        self.begin_image().await;
        let result = self.api.delete_product_image(&token, id, image_id).await;
        self.settle_image(id, result, |product| {
            product.images.retain(|image| image.id != Some(image_id));
        })
        .await
    }

    /// Set the display order of a product's images.
    ///
    /// # Errors
    ///
    /// Returns the API error; it is also kept in `image_error`.
    #[instrument(skip(self, order), fields(product_id = %id))]
    pub async fn reorder_images(
        &self,
        id: ProductId,
        order: Vec<ImageId>,
    ) -> Result<Option<Product>, ClientError> {
        let token = self.cell.authorize(&self.auth).await?;
        self.begin_image().await;
        let result = self.api.reorder_product_images(&token, id, &order).await;
        self.settle_image(id, result, |product| {
            product.images.sort_by_key(|image| {
                image
                    .id
                    .and_then(|id| order.iter().position(|ordered| *ordered == id))
                    .unwrap_or(usize::MAX)
            });
            for (position, image) in product.images.iter_mut().enumerate() {
                image.position = i32::try_from(position).ok();
            }
        })
        .await
    }

    /// Secondary image step after a create or update. Never fails the
    /// caller; returns the refreshed product when the backend sent one.
    async fn attach_best_effort(
        &self,
        token: &SecretString,
        id: ProductId,
        image: ImageSource,
    ) -> Option<Product> {
        self.begin_image().await;
        let result = match image {
            ImageSource::Url(url) => self.api.add_product_image_url(token, id, &url).await,
            ImageSource::File(file) => self.api.upload_product_image(token, id, file).await,
        };
        // Failure is already logged and kept in `image_error`; the product stays.
        self.settle_image(id, result, |_| {}).await.ok().flatten()
    }

    async fn begin_image(&self) {
        self.cell
            .update(|state| {
                state.uploading_image = true;
                state.image_error = None;
            })
            .await;
    }

    /// Record an image call's outcome. A returned product replaces the
    /// cached one; without a body `local` is applied to the cached copy.
    async fn settle_image(
        &self,
        id: ProductId,
        result: Result<Option<Product>, ApiError>,
        local: impl FnOnce(&mut Product),
    ) -> Result<Option<Product>, ClientError> {
        self.cell
            .update(|state| {
                state.uploading_image = false;
                match &result {
                    Ok(Some(product)) => {
                        replace_by(&mut state.items, product.clone(), |p| p.id);
                    }
                    Ok(None) => {
                        if let Some(product) = state.product_mut(id) {
                            local(product);
                        }
                    }
                    Err(e) => state.image_error = Some(e.to_string()),
                }
            })
            .await;

        match result {
            Ok(Some(product)) => Ok(Some(product)),
            Ok(None) => Ok(self.get(id).await),
            Err(e) => {
                warn!(product_id = %id, error = %e, "image action failed");
                Err(e.into())
            }
        }
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
