use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::engine::assignment::{
    assign_rider, complete_delivery, mark_ready, place_order, NewOrder,
};
use crate::engine::lifecycle::advance;
use crate::error::AppError;
use crate::geo::GeoPoint;
use crate::models::order::{parse_line_items, Order, OrderStatus};
use crate::models::tracking::TrackingEntry;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", post(create_order).get(list_orders))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/tracking", get(order_tracking))
        .route("/orders/:id/prepare", post(prepare_order))
        .route("/orders/:id/ready", post(ready_order))
        .route("/orders/:id/assign-rider", post(assign_order_rider))
        .route("/orders/:id/pickup", post(pickup_order))
        .route("/orders/:id/deliver", post(deliver_order))
        .route("/orders/:id/cancel", post(cancel_order))
}

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub customer_address: String,
    pub customer_location: GeoPoint,
    /// Either a JSON array of line items or a JSON-encoded string of one;
    /// legacy clients send the latter.
    pub items: Value,
    pub coupon_code: Option<String>,
}

#[derive(Deserialize)]
pub struct AssignRiderRequest {
    pub rider_id: Uuid,
}

async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<Json<Order>, AppError> {
    if payload.customer_address.trim().is_empty() {
        return Err(AppError::BadRequest("address cannot be empty".to_string()));
    }

    let items = parse_line_items(&payload.items);
    if items.is_empty() {
        return Err(AppError::BadRequest("cart is empty".to_string()));
    }

    let order = place_order(
        &state,
        NewOrder {
            customer_address: payload.customer_address,
            customer_location: payload.customer_location,
            items,
            coupon_code: payload.coupon_code,
        },
    )?;

    Ok(Json(order))
}

async fn list_orders(State(state): State<Arc<AppState>>) -> Json<Vec<Order>> {
    let mut orders: Vec<Order> = state
        .orders
        .iter()
        .map(|entry| entry.value().clone())
        .collect();

    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    Json(orders)
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let order = state
        .orders
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("order {} not found", id)))?;

    Ok(Json(order.value().clone()))
}

async fn order_tracking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<TrackingEntry>>, AppError> {
    if !state.orders.contains_key(&id) {
        return Err(AppError::NotFound(format!("order {} not found", id)));
    }

    let timeline = state
        .tracking
        .get(&id)
        .map(|entries| entries.value().clone())
        .unwrap_or_default();

    Ok(Json(timeline))
}

async fn prepare_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let order = advance(&state, id, OrderStatus::Preparing, None)?;
    Ok(Json(order))
}

async fn ready_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let order = mark_ready(&state, id)?;
    Ok(Json(order))
}

async fn assign_order_rider(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignRiderRequest>,
) -> Result<Json<Order>, AppError> {
    let order = assign_rider(&state, id, payload.rider_id)?;
    Ok(Json(order))
}

async fn pickup_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let order = advance(&state, id, OrderStatus::Picked, None)?;
    Ok(Json(order))
}

async fn deliver_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let order = complete_delivery(&state, id)?;
    Ok(Json(order))
}

async fn cancel_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let order = advance(&state, id, OrderStatus::Cancelled, None)?;
    Ok(Json(order))
}
