//! Offset/limit pagination with synthesized navigation links.
//!
//! [`paginate`] reads one page from a [`crate::storage::ReadSource`], counts
//! the source independently, and wraps both in a [`Paginated`] envelope
//! whose field names are part of the public JSON contract.
//!
//! The slice read and the count read are not mutually atomic. A concurrent
//! writer landing between them can make `totalPages` disagree with `data`.

pub mod provider;

use serde::Serialize;
use utoipa::ToSchema;

use crate::error::GatewayError;

pub use provider::{PageWindow, paginate};

/// Validated page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationQuery {
    page: u32,
    limit: u32,
}

impl PaginationQuery {
    /// Creates a query, rejecting zero values.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] if `page` or `limit` is 0.
    pub fn new(page: u32, limit: u32) -> Result<Self, GatewayError> {
        if page == 0 {
            return Err(GatewayError::InvalidRequest(
                "page must be at least 1".to_string(),
            ));
        }
        if limit == 0 {
            return Err(GatewayError::InvalidRequest(
                "limit must be at least 1".to_string(),
            ));
        }
        Ok(Self { page, limit })
    }

    /// 1-indexed page number.
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    /// Items per page.
    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.limit
    }

    /// Number of records before this page.
    #[must_use]
    pub const fn skip(&self) -> u64 {
        (self.page as u64 - 1) * self.limit as u64
    }
}

/// Where the request came from, used to build absolute links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// URL scheme, e.g. `https`.
    pub scheme: String,
    /// Host header value, including any port.
    pub host: String,
    /// Request path, e.g. `/api/v1/posts`.
    pub path: String,
    /// Raw query string without the leading `?`.
    pub query: Option<String>,
}

/// Paginated response envelope.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Paginated<T> {
    /// Records on this page, in identity order.
    pub data: Vec<T>,
    /// Page arithmetic.
    pub meta: PageMeta,
    /// Absolute navigation links.
    pub links: PageLinks,
}

/// Page arithmetic reported with every page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    /// Requested limit.
    pub items_per_page: u32,
    /// Records in the source when counted.
    pub total_items: u64,
    /// Requested page.
    pub current_page: u32,
    /// Number of pages; at least 1 even when the source is empty.
    pub total_pages: u32,
}

/// Absolute URLs for navigating the collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct PageLinks {
    /// Page 1.
    pub first: String,
    /// Last page.
    pub last: String,
    /// The requested page.
    pub current: String,
    /// Following page, or the current one on the last page.
    pub next: String,
    /// Preceding page, or the current one on page 1.
    pub previous: String,
}
