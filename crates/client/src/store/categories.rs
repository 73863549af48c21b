//! Cached categories.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use stockcount_core::{Category, CategoryId, CreateCategoryInput, PageInfo, UpdateCategoryInput};
use tracing::instrument;

use super::{ActionStatus, AuthStore, StoreCell, StoreState, remove_by, replace_by, upsert_front};
use crate::api::ApiClient;
use crate::error::{ClientError, ValidationError};
use crate::storage::{SnapshotStorage, StorageError};

const DEFAULT_LIMIT: u32 = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoriesState {
    #[serde(default)]
    pub items: Vec<Category>,
    pub pagination: PageInfo,
    #[serde(default)]
    pub status: ActionStatus,
}

impl Default for CategoriesState {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            pagination: PageInfo::empty(DEFAULT_LIMIT),
            status: ActionStatus::default(),
        }
    }
}

impl StoreState for CategoriesState {
    fn status(&self) -> &ActionStatus {
        &self.status
    }

    fn status_mut(&mut self) -> &mut ActionStatus {
        &mut self.status
    }
}

impl CategoriesState {
    /// Whether another cached category already uses `name`.
    fn name_taken(&self, name: &str, except: Option<CategoryId>) -> bool {
        self.items
            .iter()
            .any(|category| Some(category.id) != except && category.has_name(name))
    }
}

pub struct CategoryStore {
    cell: StoreCell<CategoriesState>,
    api: ApiClient,
    auth: Arc<AuthStore>,
}

impl CategoryStore {
    pub const KEY: &'static str = "categories";

    #[must_use]
    pub fn new(api: ApiClient, auth: Arc<AuthStore>, storage: Arc<dyn SnapshotStorage>) -> Self {
        Self {
            cell: StoreCell::new(Self::KEY, storage),
            api,
            auth,
        }
    }

    pub async fn state(&self) -> CategoriesState {
        self.cell.read(Clone::clone).await
    }

    pub async fn items(&self) -> Vec<Category> {
        self.cell.read(|state| state.items.clone()).await
    }

    pub async fn status(&self) -> ActionStatus {
        self.cell.read(|state| state.status().clone()).await
    }

    pub async fn total_pages(&self) -> u32 {
        self.cell.read(|state| state.pagination.total_pages).await
    }

    /// Load one page of categories, replacing the cache.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Unauthenticated` without a session, or the API
    /// error.
    #[instrument(skip(self))]
    pub async fn fetch_all(&self, page: u32, limit: u32) -> Result<Vec<Category>, ClientError> {
        let token = self.cell.authorize(&self.auth).await?;
        self.cell.begin().await;
        let result = self.api.list_categories(&token, page, limit).await;
        let listed = self
            .cell
            .settle("fetch_all", result, |state, listed| {
                state.items.clone_from(&listed.data);
                state.pagination = PageInfo::resolve(listed.pagination.as_ref(), page, limit);
            })
            .await?;
        Ok(listed.data)
    }

    /// Create a category.
    ///
    /// A name already used by a cached category (ignoring case) is rejected
    /// without calling the API.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` for an empty or duplicate name.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create(&self, input: CreateCategoryInput) -> Result<Category, ClientError> {
        let token = self.cell.authorize(&self.auth).await?;
        let name = input.name.trim();
        if name.is_empty() {
            return self
                .cell
                .reject(ValidationError::Required { field: "name" }.into())
                .await;
        }
        if self.cell.read(|state| state.name_taken(name, None)).await {
            return self.reject_duplicate(name).await;
        }

        self.cell.begin().await;
        let result = self.api.create_category(&token, &input).await;
        self.cell
            .settle("create", result, |state, created| {
                if upsert_front(&mut state.items, created.clone(), |c| c.id) {
                    state.pagination.record_insert();
                }
            })
            .await
    }

    /// Update a category, merging the patch locally when the backend sends
    /// no body back.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` if the new name belongs to another
    /// cached category.
    #[instrument(skip(self, patch), fields(category_id = %id))]
    pub async fn update(
        &self,
        id: CategoryId,
        patch: UpdateCategoryInput,
    ) -> Result<Option<Category>, ClientError> {
        let token = self.cell.authorize(&self.auth).await?;
        if let Some(name) = patch.name.as_deref().map(str::trim) {
            if name.is_empty() {
                return self
                    .cell
                    .reject(ValidationError::Required { field: "name" }.into())
                    .await;
            }
            if self.cell.read(|state| state.name_taken(name, Some(id))).await {
                return self.reject_duplicate(name).await;
            }
        }

        self.cell.begin().await;
        let result = self.api.update_category(&token, id, &patch).await;
        self.cell
            .settle("update", result, |state, updated| match updated {
                Some(category) => {
                    replace_by(&mut state.items, category.clone(), |c| c.id);
                }
                None => {
                    if let Some(category) = state.items.iter_mut().find(|c| c.id == id) {
                        category.apply(&patch);
                    }
                }
            })
            .await
    }

    /// Delete a category.
    ///
    /// # Errors
    ///
    /// Returns the API error, e.g. when the category is still in use.
    #[instrument(skip(self), fields(category_id = %id))]
    pub async fn delete(&self, id: CategoryId) -> Result<(), ClientError> {
        let token = self.cell.authorize(&self.auth).await?;
        self.cell.begin().await;
        let result = self.api.delete_category(&token, id).await;
        self.cell
            .settle("delete", result, |state, _| {
                if remove_by(&mut state.items, &id, |c| c.id) {
                    state.pagination.record_removal();
                }
            })
            .await
    }

    async fn reject_duplicate<T>(&self, name: &str) -> Result<T, ClientError> {
        self.cell
            .reject(
                ValidationError::DuplicateCategoryName {
                    name: name.to_string(),
                }
                .into(),
            )
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
