//! Request extractors.

use axum::extract::{FromRequestParts, OriginalUri};
use axum::http::header;
use axum::http::request::Parts;

use crate::app_state::AppState;
use crate::error::GatewayError;
use crate::pagination::RequestContext;

const FORWARDED_PROTO: &str = "x-forwarded-proto";

/// First entry of a comma-separated forwarding header, as set by the proxy
/// closest to the client.
fn first_hop(value: &str) -> Option<&str> {
    value
        .split(',')
        .next()
        .map(str::trim)
        .filter(|hop| !hop.is_empty())
}

/// Builds a [`RequestContext`] from the request line and headers.
///
/// The scheme comes from the first hop of `X-Forwarded-Proto`, then the request URI, then
/// the configured public scheme. The path and query come from the original
/// URI so that links survive router nesting.
impl FromRequestParts<AppState> for RequestContext {
    type Rejection = GatewayError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let uri = parts
            .extensions
            .get::<OriginalUri>()
            .map_or_else(|| parts.uri.clone(), |original| original.0.clone());

        let scheme = parts
            .headers
            .get(FORWARDED_PROTO)
            .and_then(|v| v.to_str().ok())
            .and_then(first_hop)
            .or_else(|| uri.scheme_str())
            .unwrap_or(&*state.public_scheme)
            .to_string();

        let host = parts
            .headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .or_else(|| uri.authority().map(|a| a.as_str()))
            .ok_or_else(|| GatewayError::InvalidRequest("missing Host header".to_string()))?
            .to_string();

        Ok(Self {
            scheme,
            host,
            path: uri.path().to_string(),
            query: uri.query().map(str::to_string),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_hop_takes_leading_entry() {
        assert_eq!(first_hop("https, http"), Some("https"));
        assert_eq!(first_hop("  http "), Some("http"));
    }

    #[test]
    fn empty_forwarded_value_is_ignored() {
        assert_eq!(first_hop(""), None);
        assert_eq!(first_hop(" , https"), None);
    }
}
