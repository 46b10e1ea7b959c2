use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use spares_order::User;

use crate::error::AppError;
use crate::state::AppState;

/// Header carrying the id of the calling user. Credential checks happen
/// upstream; this layer only resolves the id to a stored user.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The resolved caller, inserted into request extensions.
#[derive(Debug, Clone)]
pub struct Caller(pub User);

pub async fn require_caller(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let user_id = req
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let user = match state.engine.get_user(user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => return Err(StatusCode::UNAUTHORIZED),
        Err(e) => {
            tracing::error!(error = %e, "Caller lookup failed");
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    req.extensions_mut().insert(Caller(user));
    Ok(next.run(req).await)
}

pub fn ensure_admin(user: &User) -> Result<(), AppError> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(AppError::AuthorizationError("Admin access required".to_string()))
    }
}

/// Customers may only act on their own records.
pub fn ensure_self_or_admin(user: &User, owner_id: &str) -> Result<(), AppError> {
    if user.is_admin() || user.id == owner_id {
        Ok(())
    } else {
        Err(AppError::AuthorizationError("Access denied".to_string()))
    }
}
