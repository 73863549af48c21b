//! Products, their images and counting history.

use serde::{Deserialize, Deserializer, Serialize};

use super::null_as_default;
use super::period::InventoryPeriod;
use crate::types::{CategoryId, ImageId, Price, ProductId};

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    #[serde(
        rename = "categoryIds",
        alias = "category_ids",
        default,
        deserialize_with = "null_as_default"
    )]
    pub category_ids: Vec<CategoryId>,
    #[serde(
        rename = "categoryNames",
        alias = "category_names",
        default,
        deserialize_with = "null_as_default"
    )]
    pub category_names: Vec<String>,
    /// Images in display order.
    #[serde(default, deserialize_with = "ordered_images")]
    pub images: Vec<ProductImage>,
}

impl Product {
    /// Merge an update patch over this product's fields.
    pub fn apply(&mut self, patch: &UpdateProductInput) {
        if let Some(name) = &patch.name {
            self.name.clone_from(name);
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
        if let Some(category_ids) = &patch.category_ids {
            self.category_ids.clone_from(category_ids);
        }
    }

    /// Returns the image with the given ID, if cached.
    #[must_use]
    pub fn image(&self, image_id: ImageId) -> Option<&ProductImage> {
        self.images.iter().find(|image| image.id == Some(image_id))
    }
}

/// A product image.
///
/// Older backends return `images` as a plain list of URLs, newer ones as
/// records with an id and a display order. Both decode into this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawImage")]
pub struct ProductImage {
    pub id: Option<ImageId>,
    pub url: String,
    pub position: Option<i32>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawImage {
    Url(String),
    Record {
        #[serde(default)]
        id: Option<ImageId>,
        #[serde(alias = "image_url")]
        url: String,
        #[serde(default, alias = "display_order", alias = "sort_order")]
        position: Option<i32>,
    },
}

impl From<RawImage> for ProductImage {
    fn from(raw: RawImage) -> Self {
        match raw {
            RawImage::Url(url) => Self {
                id: None,
                url,
                position: None,
            },
            RawImage::Record { id, url, position } => Self { id, url, position },
        }
    }
}

fn ordered_images<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<ProductImage>, D::Error> {
    let mut images: Vec<ProductImage> = null_as_default(deserializer)?;
    // Stable: unpositioned images keep their wire order, after positioned ones.
    images.sort_by_key(|image| (image.position.is_none(), image.position));
    Ok(images)
}

/// Body for `POST /products`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateProductInput {
    pub name: String,
    pub price: Price,
    #[serde(rename = "categoryIds")]
    pub category_ids: Vec<CategoryId>,
}

/// Body for `PUT /products/:id`. Only present fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateProductInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Price>,
    #[serde(rename = "categoryIds", skip_serializing_if = "Option::is_none")]
    pub category_ids: Option<Vec<CategoryId>>,
}

/// Counted quantities of one product across periods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductHistory {
    pub product: Product,
    #[serde(default, deserialize_with = "null_as_default")]
    pub history: Vec<HistoryEntry>,
}

/// One period's count in a [`ProductHistory`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub period: InventoryPeriod,
    pub quantity: i32,
}
