//! Pagination envelope returned by the list endpoints.

use serde::{Deserialize, Serialize};

/// Pagination block as sent by the backend.
///
/// Older endpoints only send `page`, `limit` and `total`; the navigation
/// fields are then derived by [`PageInfo::resolve`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub total: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_next_page: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_prev_page: Option<bool>,
}

/// `{ data, pagination }` envelope, passed through unchanged by the endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

/// Fully resolved page information kept by the stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u32,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl PageInfo {
    /// An empty first page.
    #[must_use]
    pub const fn empty(limit: u32) -> Self {
        Self {
            page: 1,
            limit,
            total: 0,
            total_pages: 1,
            has_next_page: false,
            has_prev_page: false,
        }
    }

    /// Resolve the backend's (possibly partial) pagination block, falling
    /// back to the page and limit that were requested.
    #[must_use]
    pub fn resolve(wire: Option<&Pagination>, page: u32, limit: u32) -> Self {
        let Some(wire) = wire else {
            return Self {
                page: page.max(1),
                ..Self::empty(limit)
            };
        };

        let page = if wire.page == 0 { page } else { wire.page }.max(1);
        let limit = if wire.limit == 0 { limit } else { wire.limit };
        let total_pages = wire
            .total_pages
            .unwrap_or_else(|| pages_for(wire.total, limit));

        Self {
            page,
            limit,
            total: wire.total,
            total_pages,
            has_next_page: wire.has_next_page.unwrap_or(page < total_pages),
            has_prev_page: wire.has_prev_page.unwrap_or(page > 1),
        }
    }

    /// Account for one item created locally.
    pub fn record_insert(&mut self) {
        self.total += 1;
        self.recompute();
    }

    /// Account for one item deleted locally.
    pub fn record_removal(&mut self) {
        self.total = self.total.saturating_sub(1);
        self.recompute();
    }

    fn recompute(&mut self) {
        self.total_pages = pages_for(self.total, self.limit);
        self.has_next_page = self.page < self.total_pages;
        self.has_prev_page = self.page > 1;
    }
}

fn pages_for(total: u64, limit: u32) -> u32 {
    if limit == 0 {
        return 1;
    }
    u32::try_from(total.div_ceil(u64::from(limit)))
        .unwrap_or(u32::MAX)
        .max(1)
}
