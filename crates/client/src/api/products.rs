//! Product and product image endpoints.

use std::path::Path;

use reqwest::multipart::{Form, Part};
use secrecy::SecretString;
use serde::Serialize;
use stockcount_core::{
    CreateProductInput, ImageId, ItemPayload, ListPayload, Paginated, Product, ProductHistory,
    ProductId, UpdateProductInput,
};
use tracing::instrument;

use super::{ApiClient, ApiError, ApiRequest};

/// An image file to upload as multipart field `file`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    /// Read an image from disk, guessing the content type from the extension.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read.
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("image")
            .to_string();
        let content_type = content_type_for(path).to_string();

        Ok(Self {
            file_name,
            content_type,
            bytes,
        })
    }

    fn into_form(self) -> Result<Form, ApiError> {
        let part = Part::bytes(self.bytes)
            .file_name(self.file_name)
            .mime_str(&self.content_type)?;
        Ok(Form::new().part("file", part))
    }
}

fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}

/// Where a product image comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// A remote URL the backend will fetch.
    Url(String),
    /// A local file to upload.
    File(ImageFile),
}

#[derive(Serialize)]
struct ImageUrlBody<'a> {
    image_url: &'a str,
}

#[derive(Serialize)]
struct ReorderBody<'a> {
    order: &'a [ImageId],
}

impl ApiClient {
    /// List one page of products.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self, token))]
    pub async fn list_products(
        &self,
        token: &SecretString,
        page: u32,
        limit: u32,
    ) -> Result<Paginated<Product>, ApiError> {
        let path = format!("/products?page={page}&limit={limit}");
        let payload: Option<ListPayload<Product>> =
            self.send(&path, Some(token), ApiRequest::get()).await?;
        Ok(payload.unwrap_or_default().into_paginated())
    }

    /// Get a single product.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails or the body is empty.
    #[instrument(skip(self, token), fields(product_id = %id))]
    pub async fn get_product(&self, token: &SecretString, id: ProductId) -> Result<Product, ApiError> {
        let path = format!("/products/{id}");
        let payload: ItemPayload<Product> =
            self.fetch(&path, Some(token), ApiRequest::get()).await?;
        Ok(payload.into_inner())
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails or the body is empty.
    #[instrument(skip(self, token, input), fields(name = %input.name))]
    pub async fn create_product(
        &self,
        token: &SecretString,
        input: &CreateProductInput,
    ) -> Result<Product, ApiError> {
        let payload: ItemPayload<Product> = self
            .fetch("/products", Some(token), ApiRequest::post().json(input)?)
            .await?;
        Ok(payload.into_inner())
    }

    /// Update a product. `None` means the backend sent no body.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self, token, input), fields(product_id = %id))]
    pub async fn update_product(
        &self,
        token: &SecretString,
        id: ProductId,
        input: &UpdateProductInput,
    ) -> Result<Option<Product>, ApiError> {
        let path = format!("/products/{id}");
        let payload: Option<ItemPayload<Product>> = self
            .send(&path, Some(token), ApiRequest::put().json(input)?)
            .await?;
        Ok(payload.map(ItemPayload::into_inner))
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self, token), fields(product_id = %id))]
    pub async fn delete_product(&self, token: &SecretString, id: ProductId) -> Result<(), ApiError> {
        let path = format!("/products/{id}");
        self.execute(&path, Some(token), ApiRequest::delete()).await
    }

    /// Attach an image by URL. Returns the updated product when sent.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self, token, image_url), fields(product_id = %id))]
    pub async fn add_product_image_url(
        &self,
        token: &SecretString,
        id: ProductId,
        image_url: &str,
    ) -> Result<Option<Product>, ApiError> {
        let path = format!("/products/{id}/images/url");
        let request = ApiRequest::post().json(&ImageUrlBody { image_url })?;
        let payload: Option<ItemPayload<Product>> = self.send(&path, Some(token), request).await?;
        Ok(payload.map(ItemPayload::into_inner))
    }

    /// Upload an image file as multipart form data.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the form cannot be built or the request fails.
    #[instrument(skip(self, token, file), fields(product_id = %id, file_name = %file.file_name))]
    pub async fn upload_product_image(
        &self,
        token: &SecretString,
        id: ProductId,
        file: ImageFile,
    ) -> Result<Option<Product>, ApiError> {
        let path = format!("/products/{id}/images");
        let request = ApiRequest::post().multipart(file.into_form()?);
        let payload: Option<ItemPayload<Product>> = self.send(&path, Some(token), request).await?;
        Ok(payload.map(ItemPayload::into_inner))
    }

    /// Remove one image from a product.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self, token), fields(product_id = %id, image_id = %image_id))]
    pub async fn delete_product_image(
        &self,
        token: &SecretString,
        id: ProductId,
        image_id: ImageId,
    ) -> Result<Option<Product>, ApiError> {
        let path = format!("/products/{id}/images/{image_id}");
        let payload: Option<ItemPayload<Product>> =
            self.send(&path, Some(token), ApiRequest::delete()).await?;
        Ok(payload.map(ItemPayload::into_inner))
    }

    /// Set the display order of a product's images.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self, token, order), fields(product_id = %id))]
    pub async fn reorder_product_images(
        &self,
        token: &SecretString,
        id: ProductId,
        order: &[ImageId],
    ) -> Result<Option<Product>, ApiError> {
        let path = format!("/products/{id}/images/reorder");
        let request = ApiRequest::put().json(&ReorderBody { order })?;
        let payload: Option<ItemPayload<Product>> = self.send(&path, Some(token), request).await?;
        Ok(payload.map(ItemPayload::into_inner))
    }

    /// Quantity counted for a product in every period.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails or the body is empty.
    #[instrument(skip(self, token), fields(product_id = %id))]
    pub async fn product_history(
        &self,
        token: &SecretString,
        id: ProductId,
    ) -> Result<ProductHistory, ApiError> {
        let path = format!("/inventory/products/{id}/history");
        self.fetch(&path, Some(token), ApiRequest::get()).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;
    use url::Url;
    use wiremock::matchers::{body_json, body_string_contains, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::ApiConfig;

    fn client(server: &MockServer) -> ApiClient {
        ApiClient::new(&ApiConfig::new(Url::parse(&server.uri()).unwrap())).unwrap()
    }

    fn token() -> SecretString {
        SecretString::from("test-token")
    }

    fn product_json(id: i32) -> serde_json::Value {
        json!({"id": id, "name": "Milk", "price": "1.20", "categoryIds": [1]})
    }

    #[tokio::test]
    async fn test_list_accepts_bare_array() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/products"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([product_json(1)])))
            .mount(&server)
            .await;

        let page = client(&server).list_products(&token(), 1, 20).await.unwrap();
        assert_eq!(page.data.len(), 1);
        assert!(page.pagination.is_none());
    }

    #[tokio::test]
    async fn test_add_image_url_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/products/3/images/url"))
            .and(body_json(json!({"image_url": "https://cdn.example.com/milk.png"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(product_json(3)))
            .expect(1)
            .mount(&server)
            .await;

        let product = client(&server)
            .add_product_image_url(&token(), ProductId::new(3), "https://cdn.example.com/milk.png")
            .await
            .unwrap();
        assert_eq!(product.unwrap().id, ProductId::new(3));
    }

    #[tokio::test]
    async fn test_upload_image_is_multipart() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/products/3/images"))
            .and(header_exists("content-type"))
            .and(body_string_contains("name=\"file\""))
            .and(body_string_contains("filename=\"milk.png\""))
            .respond_with(ResponseTemplate::new(201).set_body_json(product_json(3)))
            .expect(1)
            .mount(&server)
            .await;

        let file = ImageFile {
            file_name: "milk.png".to_string(),
            content_type: "image/png".to_string(),
            bytes: b"fake-png".to_vec(),
        };
        let product = client(&server)
            .upload_product_image(&token(), ProductId::new(3), file)
            .await
            .unwrap();
        assert!(product.is_some());
    }

    #[tokio::test]
    async fn test_reorder_images_body() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/products/3/images/reorder"))
            .and(body_json(json!({"order": [7, 5]})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let result = client(&server)
            .reorder_product_images(&token(), ProductId::new(3), &[ImageId::new(7), ImageId::new(5)])
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_history_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/inventory/products/3/history"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "product": product_json(3),
                "history": [
                    {"period": {"id": 1, "name": "Jan", "start_date": "2026-01-01"}, "quantity": 12}
                ]
            })))
            .mount(&server)
            .await;

        let history = client(&server)
            .product_history(&token(), ProductId::new(3))
            .await
            .unwrap();
        assert_eq!(history.history.len(), 1);
        assert_eq!(history.history[0].quantity, 12);
    }

    #[test]
    fn test_content_type_for_extension() {
        assert_eq!(content_type_for(Path::new("a/b.JPG")), "image/jpeg");
        assert_eq!(content_type_for(Path::new("b.webp")), "image/webp");
        assert_eq!(content_type_for(Path::new("noext")), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_image_file_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("shelf.png");
        tokio::fs::write(&file_path, b"png-bytes").await.unwrap();

        let file = ImageFile::from_path(&file_path).await.unwrap();
        assert_eq!(file.file_name, "shelf.png");
        assert_eq!(file.content_type, "image/png");
        assert_eq!(file.bytes, b"png-bytes");
    }
}
