//! Shared DTO types used across multiple endpoints.

use serde::Deserialize;
use utoipa::IntoParams;

use crate::error::GatewayError;
use crate::pagination::PaginationQuery;

/// Pagination query parameters for list endpoints.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PaginationParams {
    /// Page number (1-indexed). Defaults to 1.
    #[serde(default = "default_page")]
    pub page: u32,
    /// Items per page. Defaults to 10.
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    10
}

impl PaginationParams {
    /// Validates the parameters into a [`PaginationQuery`].
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] if `page` or `limit` is 0.
    pub fn validate(&self) -> Result<PaginationQuery, GatewayError> {
        PaginationQuery::new(self.page, self.limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_missing() {
        let params: Option<PaginationParams> = serde_json::from_str("{}").ok();
        let params = params.map(|p| (p.page, p.limit));
        assert_eq!(params, Some((1, 10)));
    }

    #[test]
    fn zero_limit_fails_validation() {
        let params = PaginationParams { page: 1, limit: 0 };
        assert!(params.validate().is_err());
    }
}
