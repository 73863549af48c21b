//! Lifecycle status of an inventory counting period.

use serde::{Deserialize, Serialize};

/// Status of an inventory period.
///
/// The backend enforces that at most one period is `Active` at a time; the
/// client trusts it and never reconciles two active periods locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PeriodStatus {
    /// Counting is open for this period.
    #[default]
    Active,
    /// The period was closed; its records are read-only history.
    Closed,
}

impl PeriodStatus {
    /// Returns `true` for [`PeriodStatus::Active`].
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}

impl std::fmt::Display for PeriodStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

impl std::str::FromStr for PeriodStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "closed" => Ok(Self::Closed),
            _ => Err(format!("invalid period status: {s}")),
        }
    }
}
