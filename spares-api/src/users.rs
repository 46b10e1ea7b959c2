use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{post, put},
    Extension, Json, Router,
};
use serde::Serialize;
use spares_order::{NewUser, Role, User};

use crate::error::AppError;
use crate::middleware::{ensure_admin, Caller};
use crate::state::AppState;

/// A user as shown over HTTP; the password hash never leaves the server.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: Role,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            phone: user.phone,
            role: user.role,
        }
    }
}

pub fn public_routes() -> Router<AppState> {
    Router::new().route("/users", post(register_user))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admins", post(register_admin))
        .route("/users/{id}/promote", put(promote_user))
}

fn conflict(email: &str) -> AppError {
    AppError::ConflictError(format!("A user with email {} already exists", email))
}

async fn register_user(
    State(state): State<AppState>,
    Json(req): Json<NewUser>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    let email = req.email.clone();
    let user = state.engine.create_user(req).await?.ok_or_else(|| conflict(&email))?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

async fn register_admin(
    State(state): State<AppState>,
    Extension(Caller(caller)): Extension<Caller>,
    Json(req): Json<NewUser>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    ensure_admin(&caller)?;
    let email = req.email.clone();
    let admin = state.engine.create_admin(req).await?.ok_or_else(|| conflict(&email))?;
    Ok((StatusCode::CREATED, Json(admin.into())))
}

async fn promote_user(
    State(state): State<AppState>,
    Extension(Caller(caller)): Extension<Caller>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, AppError> {
    ensure_admin(&caller)?;
    let user = state
        .engine
        .promote_to_admin(&id)
        .await?
        .ok_or_else(|| AppError::not_found("User", &id))?;
    Ok(Json(user.into()))
}
