use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::Deserialize;
use spares_order::{Order, OrderView, SweepReport};

use crate::error::AppError;
use crate::middleware::{ensure_admin, ensure_self_or_admin, Caller};
use crate::state::AppState;
use crate::worker::Sweep;

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    /// Only admins may place an order on someone else's behalf.
    #[serde(default)]
    pub user_id: Option<String>,
    pub product: String,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateExpectedDeliveryRequest {
    pub expected_delivery_date: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/orders", post(create_order).get(list_orders))
        .route("/orders/check-delays", post(check_delays))
        .route("/orders/user/{user_id}", get(list_user_orders))
        .route("/orders/{id}", get(get_order).delete(delete_order))
        .route("/orders/{id}/status", put(update_status))
        .route("/orders/{id}/expected-delivery", put(update_expected_delivery))
}

async fn create_order(
    State(state): State<AppState>,
    Extension(Caller(caller)): Extension<Caller>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Order>), AppError> {
    let user_id = req.user_id.unwrap_or_else(|| caller.id.clone());
    ensure_self_or_admin(&caller, &user_id)?;
    let order = state
        .engine
        .create_order(&user_id, &req.product, req.quantity)
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

async fn list_orders(
    State(state): State<AppState>,
    Extension(Caller(caller)): Extension<Caller>,
) -> Result<Json<Vec<OrderView>>, AppError> {
    ensure_admin(&caller)?;
    Ok(Json(state.engine.list_orders().await?))
}

async fn list_user_orders(
    State(state): State<AppState>,
    Extension(Caller(caller)): Extension<Caller>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Order>>, AppError> {
    ensure_self_or_admin(&caller, &user_id)?;
    Ok(Json(state.engine.list_orders_for_user(&user_id).await?))
}

async fn get_order(
    State(state): State<AppState>,
    Extension(Caller(caller)): Extension<Caller>,
    Path(id): Path<String>,
) -> Result<Json<Order>, AppError> {
    let order = state
        .engine
        .get_order(&id)
        .await?
        .ok_or_else(|| AppError::not_found("Order", &id))?;
    ensure_self_or_admin(&caller, &order.user_id)?;
    Ok(Json(order))
}

async fn update_status(
    State(state): State<AppState>,
    Extension(Caller(caller)): Extension<Caller>,
    Path(id): Path<String>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<Order>, AppError> {
    ensure_admin(&caller)?;
    let order = state
        .engine
        .update_order_status(&id, &req.status)
        .await?
        .ok_or_else(|| AppError::not_found("Order", &id))?;
    Ok(Json(order))
}

async fn update_expected_delivery(
    State(state): State<AppState>,
    Extension(Caller(caller)): Extension<Caller>,
    Path(id): Path<String>,
    Json(req): Json<UpdateExpectedDeliveryRequest>,
) -> Result<Json<Order>, AppError> {
    ensure_admin(&caller)?;
    let order = state
        .engine
        .update_expected_delivery(&id, &req.expected_delivery_date)
        .await?
        .ok_or_else(|| AppError::not_found("Order", &id))?;
    Ok(Json(order))
}

async fn delete_order(
    State(state): State<AppState>,
    Extension(Caller(caller)): Extension<Caller>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    ensure_admin(&caller)?;
    if state.engine.delete_order(&id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("Order", &id))
    }
}

async fn check_delays(
    State(state): State<AppState>,
    Extension(Caller(caller)): Extension<Caller>,
) -> Result<Json<SweepReport>, AppError> {
    ensure_admin(&caller)?;
    Ok(Json(Sweep::Delays.run(&state).await?))
}
