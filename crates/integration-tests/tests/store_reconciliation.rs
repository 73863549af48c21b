//! Cache reconciliation after create, update and delete.

#![allow(clippy::unwrap_used)]

use serde_json::json;
use stockcount_client::{ClientError, ValidationError};
use stockcount_core::{
    CategoryId, CreateCategoryInput, PeriodId, ProductId, UpdateCategoryInput, UpdatePeriodInput,
    UpdateProductInput, UpsertRecordInput,
};
use stockcount_integration_tests::{TestContext, bearer};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

async fn seed_categories(test: &TestContext) {
    Mock::given(method("GET"))
        .and(path("/categories"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"id": 1, "name": "beverages"},
                {"id": 2, "name": "Snacks", "description": "Salty"}
            ],
            "pagination": {"page": 1, "limit": 20, "total": 2, "totalPages": 1}
        })))
        .mount(&test.server)
        .await;
    test.ctx.categories().fetch_all(1, 20).await.unwrap();
}

#[tokio::test]
async fn test_create_prepends_once_and_counts() {
    let test = TestContext::signed_in().await;
    seed_categories(&test).await;

    Mock::given(method("POST"))
        .and(path("/categories"))
        .and(header("authorization", bearer().as_str()))
        .and(body_json(json!({"name": "Dairy"})))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({"data": {"id": 3, "name": "Dairy"}})),
        )
        .expect(1)
        .mount(&test.server)
        .await;

    let created = test
        .ctx
        .categories()
        .create(CreateCategoryInput {
            name: "Dairy".to_string(),
            description: None,
        })
        .await
        .unwrap();
    assert_eq!(created.id, CategoryId::new(3));

    let state = test.ctx.categories().state().await;
    assert_eq!(state.items.first().map(|c| c.id), Some(CategoryId::new(3)));
    assert_eq!(state.items.iter().filter(|c| c.id == created.id).count(), 1);
    assert_eq!(state.pagination.total, 3);
    assert!(!state.status.loading);
    assert!(state.status.error.is_none());
}

#[tokio::test]
async fn test_duplicate_category_name_never_reaches_backend() {
    let test = TestContext::signed_in().await;
    seed_categories(&test).await;

    Mock::given(method("POST"))
        .and(path("/categories"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&test.server)
        .await;

    let err = test
        .ctx
        .categories()
        .create(CreateCategoryInput {
            name: "Beverages".to_string(),
            description: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ClientError::Validation(ValidationError::DuplicateCategoryName { .. })
    ));
    assert_eq!(err.user_message(), "Ya existe una categoría con ese nombre.");

    let state = test.ctx.categories().state().await;
    assert_eq!(state.items.len(), 2);
    assert!(state.status.error.is_some());
}

#[tokio::test]
async fn test_update_without_body_merges_patch() {
    let test = TestContext::signed_in().await;
    seed_categories(&test).await;

    Mock::given(method("PUT"))
        .and(path("/categories/2"))
        .and(body_json(json!({"name": "Chips"})))
        .respond_with(ResponseTemplate::new(204))
        .mount(&test.server)
        .await;

    let returned = test
        .ctx
        .categories()
        .update(
            CategoryId::new(2),
            UpdateCategoryInput {
                name: Some("Chips".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(returned.is_none());

    let items = test.ctx.categories().items().await;
    let chips = items.iter().find(|c| c.id == CategoryId::new(2)).unwrap();
    assert_eq!(chips.name, "Chips");
    assert_eq!(chips.description.as_deref(), Some("Salty"));
    let other = items.iter().find(|c| c.id == CategoryId::new(1)).unwrap();
    assert_eq!(other.name, "beverages");
}

#[tokio::test]
async fn test_delete_removes_and_decrements() {
    let test = TestContext::signed_in().await;
    seed_categories(&test).await;

    Mock::given(method("DELETE"))
        .and(path("/categories/1"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&test.server)
        .await;

    test.ctx.categories().delete(CategoryId::new(1)).await.unwrap();

    let state = test.ctx.categories().state().await;
    assert!(state.items.iter().all(|c| c.id != CategoryId::new(1)));
    assert_eq!(state.pagination.total, 1);
}

#[tokio::test]
async fn test_failed_update_records_error_and_keeps_cache() {
    let test = TestContext::signed_in().await;
    seed_categories(&test).await;

    Mock::given(method("PUT"))
        .and(path("/categories/2"))
        .respond_with(
            ResponseTemplate::new(409).set_body_json(json!({"error": "Category already exists"})),
        )
        .mount(&test.server)
        .await;

    let err = test
        .ctx
        .categories()
        .update(
            CategoryId::new(2),
            UpdateCategoryInput {
                name: Some("Fruit".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ClientError::Api(stockcount_client::ApiError::Status { status: 409, .. })
    ));

    let state = test.ctx.categories().state().await;
    assert_eq!(state.status.error.as_deref(), Some("API error (409): Category already exists"));
    assert!(state.items.iter().any(|c| c.name == "Snacks"));
}

#[tokio::test]
async fn test_anonymous_actions_fail_without_network() {
    let test = TestContext::anonymous().await;

    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&test.server)
        .await;

    let err = test
        .ctx
        .categories()
        .create(CreateCategoryInput {
            name: "Dairy".to_string(),
            description: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Unauthenticated));

    let err = test
        .ctx
        .products()
        .update(
            ProductId::new(1),
            UpdateProductInput::default(),
            None,
        )
        .await
        .unwrap_err();
    assert!(err.is_unauthorized());

    let err = test
        .ctx
        .periods()
        .close(PeriodId::new(1))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Unauthenticated));

    assert_eq!(
        test.ctx.categories().status().await.error.as_deref(),
        Some("Not authenticated")
    );
}

async fn seed_products(test: &TestContext) {
    Mock::given(method("GET"))
        .and(path("/products"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"id": 10, "name": "Cola", "price": "1.50", "categoryIds": [1]},
                {"id": 11, "name": "Chips", "price": "2.25", "categoryIds": [2]}
            ],
            "pagination": {"page": 1, "limit": 20, "total": 2, "totalPages": 1}
        })))
        .mount(&test.server)
        .await;
    test.ctx.products().fetch_all(1, 20).await.unwrap();
}

#[tokio::test]
async fn test_product_update_without_body_merges_patch() {
    let test = TestContext::signed_in().await;
    seed_products(&test).await;

    Mock::given(method("PUT"))
        .and(path("/products/10"))
        .and(body_json(json!({"price": 1.75})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&test.server)
        .await;

    let updated = test
        .ctx
        .products()
        .update(
            ProductId::new(10),
            UpdateProductInput {
                price: Some("1.75".parse().unwrap()),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.name, "Cola");
    assert_eq!(updated.price.to_string(), "1.75");

    let state = test.ctx.products().state().await;
    assert_eq!(state.items.len(), 2);
    assert_eq!(state.pagination.total, 2);
    let chips = state.items.iter().find(|p| p.id == ProductId::new(11)).unwrap();
    assert_eq!(chips.price.to_string(), "2.25");
}

#[tokio::test]
async fn test_product_delete_removes_and_decrements() {
    let test = TestContext::signed_in().await;
    seed_products(&test).await;

    Mock::given(method("DELETE"))
        .and(path("/products/11"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&test.server)
        .await;

    test.ctx.products().delete(ProductId::new(11)).await.unwrap();

    let state = test.ctx.products().state().await;
    assert_eq!(state.items.iter().map(|p| p.id).collect::<Vec<_>>(), vec![ProductId::new(10)]);
    assert_eq!(state.pagination.total, 1);
    assert!(test.ctx.products().get(ProductId::new(11)).await.is_none());
}

async fn seed_periods(test: &TestContext) {
    Mock::given(method("GET"))
        .and(path("/inventory/periods"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"id": 5, "name": "March", "start_date": "2024-03-01", "status": "active"},
                {"id": 4, "name": "February", "start_date": "2024-02-01", "status": "closed"}
            ]
        })))
        .mount(&test.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/inventory/periods/active"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"id": 5, "name": "March", "start_date": "2024-03-01", "status": "active"}
        })))
        .mount(&test.server)
        .await;
    test.ctx.periods().fetch_all().await.unwrap();
    test.ctx.periods().fetch_active().await.unwrap();
}

#[tokio::test]
async fn test_period_update_without_body_merges_into_list_and_active() {
    let test = TestContext::signed_in().await;
    seed_periods(&test).await;

    Mock::given(method("PUT"))
        .and(path("/inventory/periods/5"))
        .and(body_json(json!({"name": "March count"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&test.server)
        .await;

    let updated = test
        .ctx
        .periods()
        .update(
            PeriodId::new(5),
            UpdatePeriodInput {
                name: Some("March count".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(updated.is_none());

    let state = test.ctx.periods().state().await;
    let march = state.items.iter().find(|p| p.id == PeriodId::new(5)).unwrap();
    assert_eq!(march.name, "March count");
    assert_eq!(march.start_date.to_string(), "2024-03-01");
    let february = state.items.iter().find(|p| p.id == PeriodId::new(4)).unwrap();
    assert_eq!(february.name, "February");
    assert_eq!(state.active.map(|p| p.name), Some("March count".to_string()));
}

#[tokio::test]
async fn test_period_delete_removes_and_clears_active() {
    let test = TestContext::signed_in().await;
    seed_periods(&test).await;

    Mock::given(method("DELETE"))
        .and(path("/inventory/periods/4"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&test.server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/inventory/periods/5"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&test.server)
        .await;

    let periods = test.ctx.periods();
    periods.delete(PeriodId::new(4)).await.unwrap();
    assert_eq!(periods.items().await.len(), 1);
    assert_eq!(periods.active().await.map(|p| p.id), Some(PeriodId::new(5)));

    periods.delete(PeriodId::new(5)).await.unwrap();
    assert!(periods.items().await.is_empty());
    assert!(periods.active().await.is_none());
}

#[tokio::test]
async fn test_record_upsert_replaces_by_product_and_delete_removes() {
    let test = TestContext::signed_in().await;
    Mock::given(method("GET"))
        .and(path("/inventory/periods/5/records"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"id": 1, "product_id": 10, "period_id": 5, "quantity": 12},
                {"id": 2, "product_id": 11, "period_id": 5, "quantity": 4}
            ]
        })))
        .mount(&test.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/inventory/periods/5/records"))
        .and(body_json(json!({"product_id": 10, "quantity": 15})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"id": 1, "product_id": 10, "period_id": 5, "quantity": 15}
        })))
        .expect(1)
        .mount(&test.server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/inventory/periods/5/records/11"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&test.server)
        .await;

    let records = test.ctx.records();
    let period = PeriodId::new(5);
    records.fetch_by_period(period).await.unwrap();

    records
        .upsert(
            period,
            UpsertRecordInput {
                product_id: ProductId::new(10),
                quantity: 15,
                notes: None,
            },
        )
        .await
        .unwrap();
    let cached = records.records_for(period).await;
    assert_eq!(cached.len(), 2);
    assert_eq!(
        cached
            .iter()
            .filter(|r| r.product_id == ProductId::new(10))
            .map(|r| r.quantity)
            .collect::<Vec<_>>(),
        vec![15]
    );

    records.delete(period, ProductId::new(11)).await.unwrap();
    let cached = records.records_for(period).await;
    assert_eq!(cached.iter().map(|r| r.product_id).collect::<Vec<_>>(), vec![ProductId::new(10)]);
    assert!(records.status().await.error.is_none());
}
