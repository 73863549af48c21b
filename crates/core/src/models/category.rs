//! Product categories.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::CategoryId;
use crate::types::date::timestamp_opt;

/// A product category owned by the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Backend ID.
    pub id: CategoryId,
    /// Display name, unique per owner (case-insensitive).
    pub name: String,
    /// Optional free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Auth user that owns the category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    /// When the category was created.
    #[serde(default, with = "timestamp_opt")]
    pub created_at: Option<DateTime<Utc>>,
    /// When the category was last updated.
    #[serde(default, with = "timestamp_opt")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Category {
    /// Returns `true` if `name` equals this category's name ignoring case.
    #[must_use]
    pub fn has_name(&self, name: &str) -> bool {
        self.name.trim().to_lowercase() == name.trim().to_lowercase()
    }

    /// Merge an update patch over this category's fields.
    pub fn apply(&mut self, patch: &UpdateCategoryInput) {
        if let Some(name) = &patch.name {
            self.name.clone_from(name);
        }
        if let Some(description) = &patch.description {
            self.description.clone_from(description);
        }
    }
}

/// Body for `POST /categories`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateCategoryInput {
    /// Category name.
    pub name: String,
    /// Optional description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Body for `PUT /categories/:id`.
///
/// `description: Some(None)` sends an explicit `null`, clearing it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateCategoryInput {
    /// New name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New description, or `Some(None)` to clear it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn category() -> Category {
        serde_json::from_value(json!({
            "id": 4,
            "name": "Beverages",
            "description": "Drinks",
            "owner_id": "5d0c6a4e-1e7c-4d53-9a53-1f3b7e0f0c11",
            "created_at": "2024-05-01T09:00:00+00:00",
            "updated_at": null
        }))
        .unwrap()
    }

    #[test]
    fn test_deserialize_backend_row() {
        let category = category();
        assert_eq!(category.id, CategoryId::new(4));
        assert!(category.created_at.is_some());
        assert!(category.updated_at.is_none());
    }

    #[test]
    fn test_has_name_ignores_case() {
        assert!(category().has_name("beverages "));
        assert!(!category().has_name("snacks"));
    }

    #[test]
    fn test_apply_patch() {
        let mut category = category();
        category.apply(&UpdateCategoryInput {
            name: None,
            description: Some(None),
        });
        assert_eq!(category.name, "Beverages");
        assert!(category.description.is_none());
    }

    #[test]
    fn test_update_input_serialization() {
        let patch = UpdateCategoryInput {
            name: Some("Snacks".to_string()),
            description: Some(None),
        };
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            json!({"name": "Snacks", "description": null})
        );
        assert_eq!(
            serde_json::to_value(UpdateCategoryInput::default()).unwrap(),
            json!({})
        );
    }
}
