use axum::{
    extract::{FromRef, Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::{auth::jwt::TokenIssuer, error::AppError, state::AppState};

/// Rejects requests without a valid access token; on success the decoded
/// [`Claims`](crate::auth::jwt::Claims) are available as an `Extension`.
pub async fn require_access_token(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing access token".into()))?;

    let token = header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Missing access token".into()))?;

    let claims = TokenIssuer::from_ref(&state)
        .verify_access(token)
        .map_err(|e| {
            warn!(error = ?e, "access token rejected");
            AppError::Unauthorized("Invalid or expired token".into())
        })?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
