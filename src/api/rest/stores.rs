use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::queue::{prep_queue, QueueEntry};
use crate::error::AppError;
use crate::geo::GeoPoint;
use crate::models::order::Order;
use crate::models::store::Store;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/stores", post(create_store).get(list_stores))
        .route("/stores/:id/active", patch(update_store_active))
        .route("/stores/:id/orders", get(store_orders))
}

#[derive(Deserialize)]
pub struct CreateStoreRequest {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub location: GeoPoint,
}

#[derive(Deserialize)]
pub struct UpdateActiveRequest {
    pub is_active: bool,
}

async fn create_store(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateStoreRequest>,
) -> Result<Json<Store>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name cannot be empty".to_string()));
    }

    let store = Store {
        id: Uuid::new_v4(),
        name: payload.name,
        address: payload.address,
        phone: payload.phone,
        location: payload.location,
        is_active: true,
    };

    state.stores.insert(store.id, store.clone());
    Ok(Json(store))
}

async fn list_stores(State(state): State<Arc<AppState>>) -> Json<Vec<Store>> {
    let stores = state
        .stores
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    Json(stores)
}

async fn update_store_active(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateActiveRequest>,
) -> Result<Json<Store>, AppError> {
    let mut store = state
        .stores
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("store {} not found", id)))?;

    store.is_active = payload.is_active;

    Ok(Json(store.clone()))
}

/// The store operator's work queue: everything assigned or in preparation,
/// priority first.
async fn store_orders(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<QueueEntry>>, AppError> {
    if !state.stores.contains_key(&id) {
        return Err(AppError::NotFound(format!("store {} not found", id)));
    }

    let orders: Vec<Order> = state
        .orders
        .iter()
        .filter(|entry| entry.value().store_id == Some(id))
        .map(|entry| entry.value().clone())
        .collect();

    Ok(Json(prep_queue(orders, Utc::now())))
}
