//! Category endpoints.

use secrecy::SecretString;
use stockcount_core::{
    Category, CategoryId, CreateCategoryInput, ItemPayload, ListPayload, Paginated,
    UpdateCategoryInput,
};
use tracing::instrument;

use super::{ApiClient, ApiError, ApiRequest};

impl ApiClient {
    /// List one page of categories.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self, token))]
    pub async fn list_categories(
        &self,
        token: &SecretString,
        page: u32,
        limit: u32,
    ) -> Result<Paginated<Category>, ApiError> {
        let path = format!("/categories?page={page}&limit={limit}");
        let payload: Option<ListPayload<Category>> =
            self.send(&path, Some(token), ApiRequest::get()).await?;
        Ok(payload.unwrap_or_default().into_paginated())
    }

    /// Get a single category.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails or the body is empty.
    #[instrument(skip(self, token), fields(category_id = %id))]
    pub async fn get_category(
        &self,
        token: &SecretString,
        id: CategoryId,
    ) -> Result<Category, ApiError> {
        let path = format!("/categories/{id}");
        let payload: ItemPayload<Category> =
            self.fetch(&path, Some(token), ApiRequest::get()).await?;
        Ok(payload.into_inner())
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails or the body is empty.
    #[instrument(skip(self, token, input), fields(name = %input.name))]
    pub async fn create_category(
        &self,
        token: &SecretString,
        input: &CreateCategoryInput,
    ) -> Result<Category, ApiError> {
        let payload: ItemPayload<Category> = self
            .fetch("/categories", Some(token), ApiRequest::post().json(input)?)
            .await?;
        Ok(payload.into_inner())
    }

    /// Update a category.
    ///
    /// Returns `None` when the backend acknowledges without a body.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self, token, input), fields(category_id = %id))]
    pub async fn update_category(
        &self,
        token: &SecretString,
        id: CategoryId,
        input: &UpdateCategoryInput,
    ) -> Result<Option<Category>, ApiError> {
        let path = format!("/categories/{id}");
        let payload: Option<ItemPayload<Category>> = self
            .send(&path, Some(token), ApiRequest::put().json(input)?)
            .await?;
        Ok(payload.map(ItemPayload::into_inner))
    }

    /// Delete a category.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self, token), fields(category_id = %id))]
    pub async fn delete_category(&self, token: &SecretString, id: CategoryId) -> Result<(), ApiError> {
        let path = format!("/categories/{id}");
        self.execute(&path, Some(token), ApiRequest::delete()).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;
    use url::Url;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::ApiConfig;

    fn client(server: &MockServer) -> ApiClient {
        ApiClient::new(&ApiConfig::new(Url::parse(&server.uri()).unwrap())).unwrap()
    }

    fn token() -> SecretString {
        SecretString::from("test-token")
    }

    #[tokio::test]
    async fn test_list_passes_pagination_through() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/categories"))
            .and(query_param("page", "2"))
            .and(query_param("limit", "10"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"id": 1, "name": "Dairy"}],
                "pagination": {"page": 2, "limit": 10, "total": 11, "totalPages": 2}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let page = client(&server).list_categories(&token(), 2, 10).await.unwrap();
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.pagination.unwrap().total_pages, Some(2));
    }

    #[tokio::test]
    async fn test_create_sends_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/categories"))
            .and(body_json(json!({"name": "Frozen"})))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(json!({"data": {"id": 4, "name": "Frozen"}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let input = CreateCategoryInput {
            name: "Frozen".to_string(),
            description: None,
        };
        let created = client(&server).create_category(&token(), &input).await.unwrap();
        assert_eq!(created.id, CategoryId::new(4));
    }

    #[tokio::test]
    async fn test_update_without_body_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/categories/4"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let patch = UpdateCategoryInput {
            name: Some("Frozen food".to_string()),
            ..Default::default()
        };
        let updated = client(&server)
            .update_category(&token(), CategoryId::new(4), &patch)
            .await
            .unwrap();
        assert!(updated.is_none());
    }

    #[tokio::test]
    async fn test_delete_surfaces_status() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/categories/4"))
            .respond_with(
                ResponseTemplate::new(409).set_body_json(json!({"error": "Category has products"})),
            )
            .mount(&server)
            .await;

        let err = client(&server)
            .delete_category(&token(), CategoryId::new(4))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(409));
        assert!(err.to_string().contains("Category has products"));
    }
}
