//! User handlers: bulk create and paginated listing.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{CreateManyUsersRequest, PaginationParams};
use crate::app_state::AppState;
use crate::domain::User;
use crate::error::{ErrorResponse, GatewayError};
use crate::pagination::{Paginated, RequestContext};

/// `POST /users/create-many` — Create several users atomically.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] on validation failure and a
/// [`GatewayError::Batch`] if the transaction fails.
#[utoipa::path(
    post,
    path = "/api/v1/users/create-many",
    tag = "Users",
    summary = "Create many users",
    description = "Creates every user in the body inside one transaction. Either all users are stored, in input order, or none are.",
    request_body = CreateManyUsersRequest,
    responses(
        (status = 201, description = "Users created", body = Vec<User>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 408, description = "Database unavailable or connection not released", body = ErrorResponse),
        (status = 409, description = "Transaction rolled back", body = ErrorResponse),
    )
)]
pub async fn create_many_users(
    State(state): State<AppState>,
    Json(req): Json<CreateManyUsersRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    // Argon2 hashing is CPU bound.
    let drafts = tokio::task::spawn_blocking(move || req.into_drafts())
        .await
        .map_err(|e| GatewayError::Internal(e.to_string()))??;

    let users = state.users.create_many(drafts).await?;
    Ok((StatusCode::CREATED, Json(users)))
}

/// `GET /users` — List users page by page.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] on invalid paging parameters and
/// [`GatewayError::Storage`] if the store cannot be read.
#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "Users",
    summary = "List users",
    description = "Returns one page of users with page metadata and absolute navigation links.",
    params(PaginationParams),
    responses(
        (status = 200, description = "Paginated user list", body = Paginated<User>),
        (status = 400, description = "Invalid paging parameters", body = ErrorResponse),
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
    ctx: RequestContext,
) -> Result<impl IntoResponse, GatewayError> {
    let query = params.validate()?;
    let page = state.users.list(query, &ctx).await?;
    Ok(Json(page))
}

/// User routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/create-many", post(create_many_users))
}
