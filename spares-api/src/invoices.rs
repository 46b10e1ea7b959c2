use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::Deserialize;
use spares_order::{Invoice, NewGstInvoice};

use crate::error::AppError;
use crate::middleware::{ensure_admin, ensure_self_or_admin, Caller};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateInvoiceRequest {
    pub order_id: String,
    pub unit_price: f64,
    #[serde(default)]
    pub tax_percentage: f64,
    #[serde(default)]
    pub discount_percentage: f64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateInvoiceStatusRequest {
    pub status: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/invoices", post(create_invoice).get(list_invoices))
        .route("/invoices/gst", post(create_gst_invoice))
        .route("/invoices/order/{order_id}", get(get_invoice_by_order))
        .route("/invoices/{id}", get(get_invoice).delete(delete_invoice))
        .route("/invoices/{id}/status", put(update_status))
}

async fn create_invoice(
    State(state): State<AppState>,
    Extension(Caller(caller)): Extension<Caller>,
    Json(req): Json<CreateInvoiceRequest>,
) -> Result<(StatusCode, Json<Invoice>), AppError> {
    ensure_admin(&caller)?;
    let invoice = state
        .engine
        .create_invoice(
            &req.order_id,
            req.unit_price,
            req.tax_percentage,
            req.discount_percentage,
        )
        .await?
        .ok_or_else(|| AppError::not_found("Order", &req.order_id))?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

async fn create_gst_invoice(
    State(state): State<AppState>,
    Extension(Caller(caller)): Extension<Caller>,
    Json(req): Json<NewGstInvoice>,
) -> Result<(StatusCode, Json<Invoice>), AppError> {
    ensure_admin(&caller)?;
    let invoice = state.engine.create_gst_invoice(req).await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

async fn list_invoices(
    State(state): State<AppState>,
    Extension(Caller(caller)): Extension<Caller>,
) -> Result<Json<Vec<Invoice>>, AppError> {
    ensure_admin(&caller)?;
    Ok(Json(state.engine.list_invoices().await?))
}

async fn get_invoice(
    State(state): State<AppState>,
    Extension(Caller(caller)): Extension<Caller>,
    Path(id): Path<String>,
) -> Result<Json<Invoice>, AppError> {
    ensure_admin(&caller)?;
    let invoice = state
        .engine
        .get_invoice(&id)
        .await?
        .ok_or_else(|| AppError::not_found("Invoice", &id))?;
    Ok(Json(invoice))
}

/// Customers can fetch the invoice of their own order.
async fn get_invoice_by_order(
    State(state): State<AppState>,
    Extension(Caller(caller)): Extension<Caller>,
    Path(order_id): Path<String>,
) -> Result<Json<Invoice>, AppError> {
    let order = state
        .engine
        .get_order(&order_id)
        .await?
        .ok_or_else(|| AppError::not_found("Order", &order_id))?;
    ensure_self_or_admin(&caller, &order.user_id)?;
    let invoice = state
        .engine
        .get_invoice_by_order(&order_id)
        .await?
        .ok_or_else(|| AppError::NotFoundError(format!("No invoice for order {}", order_id)))?;
    Ok(Json(invoice))
}

async fn update_status(
    State(state): State<AppState>,
    Extension(Caller(caller)): Extension<Caller>,
    Path(id): Path<String>,
    Json(req): Json<UpdateInvoiceStatusRequest>,
) -> Result<Json<Invoice>, AppError> {
    ensure_admin(&caller)?;
    let invoice = state
        .engine
        .update_invoice_status(&id, &req.status)
        .await?
        .ok_or_else(|| AppError::not_found("Invoice", &id))?;
    Ok(Json(invoice))
}

async fn delete_invoice(
    State(state): State<AppState>,
    Extension(Caller(caller)): Extension<Caller>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    ensure_admin(&caller)?;
    if state.engine.delete_invoice(&id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("Invoice", &id))
    }
}
