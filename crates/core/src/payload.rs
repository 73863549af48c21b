//! Tolerant decoding of the backend's list and item response shapes.
//!
//! Across backend versions the same endpoint has answered with a bare JSON
//! array, a `{ "data": [...] }` envelope, or a full paginated envelope, and
//! single-item endpoints with either the item itself or `{ "data": item }`.
//! These wrappers accept all of them so callers only see the payload.

use serde::{Deserialize, Serialize};

use crate::models::{Paginated, Pagination};

/// A list response in any of the shapes the backend uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ListPayload<T> {
    /// `{ "data": [...], "pagination"?: {...} }`
    Enveloped(Paginated<T>),
    /// `[...]`
    Bare(Vec<T>),
}

impl<T> ListPayload<T> {
    /// The pagination block, when the backend sent one.
    #[must_use]
    pub const fn pagination(&self) -> Option<&Pagination> {
        match self {
            Self::Enveloped(page) => page.pagination.as_ref(),
            Self::Bare(_) => None,
        }
    }

    /// Discard the envelope and return the items.
    #[must_use]
    pub fn into_items(self) -> Vec<T> {
        match self {
            Self::Enveloped(page) => page.data,
            Self::Bare(items) => items,
        }
    }

    /// Normalize any shape into the paginated envelope. Bare lists come
    /// back without a pagination block.
    #[must_use]
    pub fn into_paginated(self) -> Paginated<T> {
        match self {
            Self::Enveloped(page) => page,
            Self::Bare(data) => Paginated {
                data,
                pagination: None,
            },
        }
    }
}

impl<T> Default for ListPayload<T> {
    fn default() -> Self {
        Self::Bare(Vec::new())
    }
}

/// A single-item response, bare or wrapped in `{ "data": item }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemPayload<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> ItemPayload<T> {
    /// Discard the wrapper and return the item.
    #[must_use]
    pub fn into_inner(self) -> T {
        match self {
            Self::Wrapped { data } | Self::Bare(data) => data,
        }
    }
}
