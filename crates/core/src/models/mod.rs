//! Records mirrored from the inventory backend.
//!
//! The client never mints identifiers for these; every record is owned by
//! the backend and held here only as a best-effort replica.

mod category;
mod pagination;
mod period;
mod product;
mod record;

pub use category::{Category, CreateCategoryInput, UpdateCategoryInput};
pub use pagination::{PageInfo, Paginated, Pagination};
pub use period::{CreatePeriodInput, InventoryPeriod, UpdatePeriodInput};
pub use product::{
    CreateProductInput, HistoryEntry, Product, ProductHistory, ProductImage, UpdateProductInput,
};
pub use record::{CurrentInventory, InventoryRecord, RecordProduct, UpsertRecordInput};

use serde::{Deserialize, Deserializer};

/// Treat an explicit JSON `null` the same as a missing field.
///
/// Several list fields (`categoryIds`, `images`, `records`) arrive as `null`
/// instead of `[]` on older backend builds.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
