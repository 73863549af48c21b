//! Best-effort image attachment around product create and update.

#![allow(clippy::unwrap_used)]

use serde_json::json;
use stockcount_client::{ImageFile, ImageSource};
use stockcount_core::{CategoryId, CreateProductInput, ImageId, ProductId, UpdateProductInput};
use stockcount_integration_tests::TestContext;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, ResponseTemplate};

fn cola() -> CreateProductInput {
    CreateProductInput {
        name: "Cola".to_string(),
        price: "1.50".parse().unwrap(),
        category_ids: vec![CategoryId::new(2)],
    }
}

async fn mount_create(test: &TestContext) {
    Mock::given(method("POST"))
        .and(path("/products"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "data": {"id": 7, "name": "Cola", "price": "1.50", "categoryIds": [2], "images": []}
        })))
        .expect(1)
        .mount(&test.server)
        .await;
}

#[tokio::test]
async fn test_failed_upload_keeps_created_product() {
    let test = TestContext::signed_in().await;
    mount_create(&test).await;
    Mock::given(method("POST"))
        .and(path("/products/7/images"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "storage offline"})))
        .expect(1)
        .mount(&test.server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("cola.png");
    std::fs::write(&file, [0x89, b'P', b'N', b'G']).unwrap();
    let image = ImageFile::from_path(&file).await.unwrap();

    let created = test
        .ctx
        .products()
        .create(cola(), Some(ImageSource::File(image)))
        .await
        .unwrap();
    assert_eq!(created.id, ProductId::new(7));
    assert!(created.images.is_empty());

    let state = test.ctx.products().state().await;
    assert_eq!(state.items.len(), 1);
    assert_eq!(state.pagination.total, 1);
    assert!(!state.uploading_image);
    assert!(state.image_error.unwrap().contains("storage offline"));
    assert!(state.status.error.is_none());
}

#[tokio::test]
async fn test_image_url_replaces_cached_product() {
    let test = TestContext::signed_in().await;
    mount_create(&test).await;
    Mock::given(method("POST"))
        .and(path("/products/7/images/url"))
        .and(body_json(json!({"image_url": "https://cdn.example.com/cola.png"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "id": 7, "name": "Cola", "price": "1.50",
                "images": [{"id": 31, "url": "https://cdn.example.com/cola.png", "display_order": 0}]
            }
        })))
        .mount(&test.server)
        .await;

    let created = test
        .ctx
        .products()
        .create(
            cola(),
            Some(ImageSource::Url("https://cdn.example.com/cola.png".to_string())),
        )
        .await
        .unwrap();
    assert_eq!(created.images.len(), 1);

    let cached = test.ctx.products().get(ProductId::new(7)).await.unwrap();
    assert_eq!(cached.images.first().and_then(|i| i.id), Some(ImageId::new(31)));
    assert!(test.ctx.products().state().await.image_error.is_none());
}

#[tokio::test]
async fn test_update_failure_skips_image_step() {
    let test = TestContext::signed_in().await;
    Mock::given(method("PUT"))
        .and(path("/products/7"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"message": "name is required"})))
        .mount(&test.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/products/7/images/url"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&test.server)
        .await;

    let err = test
        .ctx
        .products()
        .update(
            ProductId::new(7),
            UpdateProductInput {
                name: Some(String::new()),
                ..Default::default()
            },
            Some(ImageSource::Url("https://cdn.example.com/x.png".to_string())),
        )
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "Falta completar campos obligatorios.");
}

#[tokio::test]
async fn test_explicit_image_delete_surfaces_errors() {
    let test = TestContext::signed_in().await;
    Mock::given(method("DELETE"))
        .and(path("/products/7/images/31"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Image not found"})))
        .mount(&test.server)
        .await;

    let err = test
        .ctx
        .products()
        .delete_image(ProductId::new(7), ImageId::new(31))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "API error (404): Image not found");
    let state = test.ctx.products().state().await;
    assert_eq!(state.image_error.as_deref(), Some("API error (404): Image not found"));
    assert!(!state.uploading_image);
}

#[tokio::test]
async fn test_save_without_image_clears_stale_image_error() {
    let test = TestContext::signed_in().await;
    Mock::given(method("POST"))
        .and(path("/products/7/images/url"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"message": "invalid file type"})))
        .expect(1)
        .mount(&test.server)
        .await;
    mount_create(&test).await;

    let products = test.ctx.products();
    products
        .add_image_url(ProductId::new(7), "https://cdn.example.com/cola.bmp")
        .await
        .unwrap_err();
    assert_eq!(
        products.state().await.image_error.as_deref(),
        Some("API error (400): invalid file type")
    );

    products.create(cola(), None).await.unwrap();
    assert!(products.state().await.image_error.is_none());
}
