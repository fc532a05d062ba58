//! REST API layer: route handlers, DTOs, extractors, and router composition.
//!
//! Resource endpoints are mounted under `/api/v1`.

pub mod dto;
pub mod extract;
pub mod handlers;

use axum::Router;

use crate::app_state::AppState;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes())
}

/// OpenAPI document for every REST endpoint.
#[cfg(feature = "swagger-ui")]
#[derive(Debug, utoipa::OpenApi)]
#[openapi(
    paths(
        handlers::users::create_many_users,
        handlers::users::list_users,
        handlers::posts::list_posts,
        handlers::system::health_handler,
    ),
    tags(
        (name = "Users", description = "User accounts"),
        (name = "Posts", description = "Blog posts"),
        (name = "System", description = "Service status"),
    )
)]
pub struct ApiDoc;
