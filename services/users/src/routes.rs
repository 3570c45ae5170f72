//! User service routes

use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use tracing::{info, warn};

use crate::{
    AppState,
    error::{UserError, UserResult},
    jwt::Claims,
    middleware::auth_middleware,
    models::{
        CountResponse, CreateUserRequest, PaginationQuery, PatchUserRequest, SignInRequest,
        UpdateUserRequest, UserId, UserResponse,
    },
};

/// Create the router for the user service
pub fn create_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/api/v1/users", get(get_users).post(create_user))
        .route("/api/v1/users/count", get(count_users))
        .route("/api/v1/roles", get(list_roles))
        .route(
            "/api/v1/users/username/:username",
            get(get_user_by_username),
        )
        .route("/api/v1/users/email/:email", get(get_user_by_email))
        .route(
            "/api/v1/users/:id",
            get(get_user)
                .put(update_user)
                .patch(patch_user)
                .delete(delete_user),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/auth/signin", post(sign_in))
        .route("/api/v1/auth/register", post(register))
        .merge(protected_routes)
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "users-service"
    }))
}

pub async fn sign_in(
    State(state): State<AppState>,
    Json(payload): Json<SignInRequest>,
) -> UserResult<impl IntoResponse> {
    let response = state.auth_service.sign_in(payload).await?;
    Ok(Json(response))
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> UserResult<impl IntoResponse> {
    let response = state.auth_service.register(payload).await?;
    Ok(Json(response))
}

/// Paginated user listing; an empty page answers 204
pub async fn get_users(
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> UserResult<Response> {
    let request = state.config.page_request(query);
    let page = state.user_service.get_page(request).await?;

    if page.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    Ok(Json(page.map(UserResponse::from)).into_response())
}

pub async fn count_users(State(state): State<AppState>) -> UserResult<impl IntoResponse> {
    let count = state.user_service.count().await?;
    Ok(Json(CountResponse { count }))
}

/// Role names a user can be granted
pub async fn list_roles(State(state): State<AppState>) -> UserResult<impl IntoResponse> {
    let roles = state.role_resolver.catalog().await?;
    let names: Vec<String> = roles.into_iter().map(|r| r.name).collect();
    Ok(Json(names))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> UserResult<impl IntoResponse> {
    let user = state.user_service.get_by_id(id).await?;
    UserResponse::from_optional(user.as_ref())
        .map(Json)
        .ok_or(UserError::NotFound(id))
}

pub async fn get_user_by_username(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> UserResult<impl IntoResponse> {
    let user = state.user_service.get_by_username(&username).await?;
    UserResponse::from_optional(user.as_ref())
        .map(Json)
        .ok_or_else(|| UserError::NotFoundBy(format!("username {}", username)))
}

pub async fn get_user_by_email(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> UserResult<impl IntoResponse> {
    let user = state.user_service.get_by_email(&email).await?;
    UserResponse::from_optional(user.as_ref())
        .map(Json)
        .ok_or_else(|| UserError::NotFoundBy(format!("email {}", email)))
}

pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> UserResult<impl IntoResponse> {
    let user = state.user_service.add(payload).await?;
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    Json(payload): Json<UpdateUserRequest>,
) -> UserResult<impl IntoResponse> {
    let user = state.user_service.update(id, payload).await?;
    Ok(Json(UserResponse::from(user)))
}

pub async fn patch_user(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    Json(payload): Json<PatchUserRequest>,
) -> UserResult<impl IntoResponse> {
    let user = state.user_service.patch(id, payload).await?;
    Ok(Json(UserResponse::from(user)))
}

/// Delete a user; restricted to administrators
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<UserId>,
) -> UserResult<impl IntoResponse> {
    if !claims.is_admin() {
        warn!(caller = %claims.sub, user_id = id, "Delete refused: caller is not an admin");
        return Err(UserError::Forbidden);
    }

    state.user_service.delete(id).await?;
    info!(caller = %claims.sub, user_id = id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}
