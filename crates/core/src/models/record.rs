//! Per-period inventory records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::null_as_default;
use super::period::InventoryPeriod;
use crate::types::date::timestamp_opt;
use crate::types::{PeriodId, Price, ProductId, RecordId};

/// A product's counted quantity within one period.
///
/// Unique per `(product_id, period_id)`; the backend upserts on that pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub id: RecordId,
    pub product_id: ProductId,
    pub period_id: PeriodId,
    pub quantity: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, with = "timestamp_opt", skip_serializing_if = "Option::is_none")]
    pub counted_at: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp_opt", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp_opt", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Product summary embedded by list endpoints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<RecordProduct>,
}

/// Product summary embedded in an [`InventoryRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordProduct {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
}

/// Body for `POST /inventory/periods/:id/records`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpsertRecordInput {
    pub product_id: ProductId,
    pub quantity: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Response of `GET /inventory/current`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentInventory {
    #[serde(default)]
    pub period: Option<InventoryPeriod>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub records: Vec<InventoryRecord>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_record_with_embedded_product() {
        let record: InventoryRecord = serde_json::from_value(json!({
            "id": 3, "product_id": 10, "period_id": 2, "quantity": 14,
            "notes": null,
            "counted_at": "2024-03-02 08:15:00",
            "product": {"id": 10, "name": "Cola", "price": "1.50"}
        }))
        .unwrap();
        assert_eq!(record.product.unwrap().name, "Cola");
        assert!(record.counted_at.is_some());
        assert!(record.notes.is_none());
    }

    #[test]
    fn test_current_inventory_without_period() {
        let current: CurrentInventory =
            serde_json::from_value(json!({"period": null, "records": null})).unwrap();
        assert!(current.period.is_none());
        assert!(current.records.is_empty());
    }
}
