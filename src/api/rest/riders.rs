use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::geo::GeoPoint;
use crate::models::order::{Order, OrderStatus};
use crate::models::rider::Rider;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/riders", post(create_rider).get(list_riders))
        .route("/riders/:id/location", patch(update_rider_location))
        .route("/riders/:id/orders", get(rider_orders))
}

#[derive(Deserialize)]
pub struct CreateRiderRequest {
    pub name: String,
    pub phone: String,
    pub store_id: Uuid,
    pub location: GeoPoint,
}

#[derive(Deserialize)]
pub struct RiderListQuery {
    pub store_id: Option<Uuid>,
    pub available: Option<bool>,
}

#[derive(Deserialize)]
pub struct UpdateLocationRequest {
    pub location: GeoPoint,
}

async fn create_rider(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateRiderRequest>,
) -> Result<Json<Rider>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name cannot be empty".to_string()));
    }

    if !state.stores.contains_key(&payload.store_id) {
        return Err(AppError::BadRequest(format!(
            "store {} does not exist",
            payload.store_id
        )));
    }

    let rider = Rider {
        id: Uuid::new_v4(),
        name: payload.name,
        phone: payload.phone,
        store_id: payload.store_id,
        location: payload.location,
        is_available: true,
        updated_at: Utc::now(),
    };

    state.riders.insert(rider.id, rider.clone());
    state
        .metrics
        .riders_available
        .with_label_values(&[&rider.store_id.to_string()])
        .inc();

    Ok(Json(rider))
}

async fn list_riders(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RiderListQuery>,
) -> Json<Vec<Rider>> {
    let riders = state
        .riders
        .iter()
        .filter(|entry| {
            let rider = entry.value();
            query.store_id.is_none_or(|id| rider.store_id == id)
                && query.available.is_none_or(|flag| rider.is_available == flag)
        })
        .map(|entry| entry.value().clone())
        .collect();

    Json(riders)
}

async fn update_rider_location(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateLocationRequest>,
) -> Result<Json<Rider>, AppError> {
    let mut rider = state
        .riders
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("rider {} not found", id)))?;

    rider.location = payload.location;
    rider.updated_at = Utc::now();

    Ok(Json(rider.clone()))
}

/// The rider's run sheet: orders assigned or already picked up, oldest first.
async fn rider_orders(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Order>>, AppError> {
    if !state.riders.contains_key(&id) {
        return Err(AppError::NotFound(format!("rider {} not found", id)));
    }

    let mut orders: Vec<Order> = state
        .orders
        .iter()
        .filter(|entry| {
            let order = entry.value();
            order.rider_id == Some(id)
                && matches!(
                    order.status,
                    OrderStatus::AssignedToRider | OrderStatus::Picked
                )
        })
        .map(|entry| entry.value().clone())
        .collect();

    orders.sort_by(|a, b| a.created_at.cmp(&b.created_at));

    Ok(Json(orders))
}
