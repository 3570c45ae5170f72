//! Middleware for JWT token validation and authentication

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use tracing::debug;

use crate::{AppState, error::UserError};

/// Validate the bearer token and expose its [`Claims`](crate::jwt::Claims)
/// to handlers through the request extensions
pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, UserError> {
    let TypedHeader(Authorization(bearer)) = bearer.ok_or_else(|| {
        debug!("Request without bearer token");
        UserError::Unauthorized
    })?;

    let claims = state.jwt_service.validate_token(bearer.token()).map_err(|e| {
        debug!("Failed to validate token: {}", e);
        e
    })?;

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}
