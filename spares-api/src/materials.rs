use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, post, put},
    Extension, Json, Router,
};
use spares_order::{NewRawMaterial, RawMaterial, SweepReport};

use crate::error::AppError;
use crate::middleware::{ensure_admin, Caller};
use crate::state::AppState;
use crate::worker::Sweep;

// Raw material handling is workshop-only.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/raw-materials", post(create_material).get(list_materials))
        .route("/raw-materials/check-natural-alerts", post(check_natural_alerts))
        .route("/raw-materials/{id}", delete(delete_material))
        .route("/raw-materials/{id}/consume", put(consume_material))
}

async fn create_material(
    State(state): State<AppState>,
    Extension(Caller(caller)): Extension<Caller>,
    Json(req): Json<NewRawMaterial>,
) -> Result<(StatusCode, Json<RawMaterial>), AppError> {
    ensure_admin(&caller)?;
    let material = state.engine.create_raw_material(req).await?;
    Ok((StatusCode::CREATED, Json(material)))
}

async fn list_materials(
    State(state): State<AppState>,
    Extension(Caller(caller)): Extension<Caller>,
) -> Result<Json<Vec<RawMaterial>>, AppError> {
    ensure_admin(&caller)?;
    Ok(Json(state.engine.list_raw_materials().await?))
}

async fn consume_material(
    State(state): State<AppState>,
    Extension(Caller(caller)): Extension<Caller>,
    Path(id): Path<String>,
) -> Result<Json<RawMaterial>, AppError> {
    ensure_admin(&caller)?;
    let material = state
        .engine
        .mark_consumed(&id)
        .await?
        .ok_or_else(|| AppError::not_found("Raw material", &id))?;
    Ok(Json(material))
}

async fn delete_material(
    State(state): State<AppState>,
    Extension(Caller(caller)): Extension<Caller>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    ensure_admin(&caller)?;
    if state.engine.delete_raw_material(&id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("Raw material", &id))
    }
}

async fn check_natural_alerts(
    State(state): State<AppState>,
    Extension(Caller(caller)): Extension<Caller>,
) -> Result<Json<SweepReport>, AppError> {
    ensure_admin(&caller)?;
    Ok(Json(Sweep::NaturalRubber.run(&state).await?))
}
