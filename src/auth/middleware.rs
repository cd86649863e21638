use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use super::{claims::Identity, jwt::JwtKeys};
use crate::error::AppError;

/// Gate for protected routes: verifies the bearer token and stashes the
/// decoded [`Identity`] in the request extensions. Never answers on its own
/// except to reject.
pub async fn require_auth(
    State(keys): State<JwtKeys>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::Unauthorized("Missing authorization header"))?;

    // "<scheme> <token>", scheme word not checked
    let token = header
        .split_whitespace()
        .nth(1)
        .ok_or(AppError::Unauthorized("Invalid token"))?;

    let identity = keys.verify(token).map_err(|e| {
        warn!(error = %e, "rejected bearer token");
        AppError::Unauthorized("Invalid token")
    })?;

    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

/// The identity [`require_auth`] attached to this request.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Identity);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .map(AuthUser)
            .ok_or(AppError::Unauthorized("Missing authorization header"))
    }
}
