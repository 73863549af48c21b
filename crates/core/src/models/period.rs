//! Inventory counting periods.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::date::{calendar, calendar_opt};
use crate::types::{PeriodId, PeriodStatus};

/// A bounded inventory-counting window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryPeriod {
    pub id: PeriodId,
    pub name: String,
    #[serde(with = "calendar")]
    pub start_date: NaiveDate,
    #[serde(default, with = "calendar_opt", skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PeriodStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl InventoryPeriod {
    /// Resolve the period's status from whichever fields the backend sent.
    ///
    /// `status` wins over `is_active`; with neither, an open-ended period is
    /// considered active.
    #[must_use]
    pub fn effective_status(&self) -> PeriodStatus {
        match (self.status, self.is_active) {
            (Some(status), _) => status,
            (None, Some(true)) => PeriodStatus::Active,
            (None, Some(false)) => PeriodStatus::Closed,
            (None, None) if self.end_date.is_none() => PeriodStatus::Active,
            (None, None) => PeriodStatus::Closed,
        }
    }

    /// Returns `true` if counting is open in this period.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.effective_status().is_active()
    }

    /// Mark the period closed locally after the backend confirmed it.
    pub fn mark_closed(&mut self) {
        self.status = Some(PeriodStatus::Closed);
        self.is_active = Some(false);
    }

    /// Merge an update patch over this period's fields.
    pub fn apply(&mut self, patch: &UpdatePeriodInput) {
        if let Some(name) = &patch.name {
            self.name.clone_from(name);
        }
        if patch.end_date.is_some() {
            self.end_date = patch.end_date;
        }
        if let Some(notes) = &patch.notes {
            self.notes = Some(notes.clone());
        }
    }
}

/// Body for `POST /inventory/periods`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatePeriodInput {
    pub name: String,
    #[serde(with = "calendar")]
    pub start_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Body for `PUT /inventory/periods/:id`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdatePeriodInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(with = "calendar_opt", skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn period(extra: serde_json::Value) -> InventoryPeriod {
        let mut value = json!({"id": 1, "name": "March", "start_date": "2024-03-01"});
        if let (Some(base), Some(extra)) = (value.as_object_mut(), extra.as_object()) {
            base.extend(extra.clone());
        }
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_status_resolution() {
        assert!(period(json!({})).is_active());
        assert!(!period(json!({"end_date": "2024-03-31"})).is_active());
        assert!(period(json!({"is_active": true, "end_date": "2024-03-31"})).is_active());
        assert!(!period(json!({"status": "closed", "is_active": true})).is_active());
    }

    #[test]
    fn test_timestamp_dates_are_accepted() {
        let p = period(json!({"end_date": "2024-03-31T23:59:59.000Z"}));
        assert_eq!(p.end_date, NaiveDate::from_ymd_opt(2024, 3, 31));
    }

    #[test]
    fn test_mark_closed() {
        let mut p = period(json!({"status": "active"}));
        p.mark_closed();
        assert_eq!(p.effective_status(), PeriodStatus::Closed);
    }

    #[test]
    fn test_create_input_wire_format() {
        let input = CreatePeriodInput {
            name: "April".to_string(),
            start_date: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
            notes: None,
        };
        assert_eq!(
            serde_json::to_value(&input).unwrap(),
            json!({"name": "April", "start_date": "2024-04-01"})
        );
    }
}
