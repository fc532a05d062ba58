//! Post handlers.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::PaginationParams;
use crate::app_state::AppState;
use crate::domain::Post;
use crate::error::{ErrorResponse, GatewayError};
use crate::pagination::{Paginated, RequestContext};

/// `GET /posts` — List posts page by page.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] on invalid paging parameters and
/// [`GatewayError::Storage`] if the store cannot be read.
#[utoipa::path(
    get,
    path = "/api/v1/posts",
    tag = "Posts",
    summary = "List posts",
    description = "Returns one page of posts with page metadata and absolute navigation links.",
    params(PaginationParams),
    responses(
        (status = 200, description = "Paginated post list", body = Paginated<Post>),
        (status = 400, description = "Invalid paging parameters", body = ErrorResponse),
    )
)]
pub async fn list_posts(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
    ctx: RequestContext,
) -> Result<impl IntoResponse, GatewayError> {
    let query = params.validate()?;
    let page = state.posts.list(query, &ctx).await?;
    Ok(Json(page))
}

/// Post routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/posts", get(list_posts))
}
