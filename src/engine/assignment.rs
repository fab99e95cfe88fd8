use std::time::Instant;

use chrono::{Duration, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::cart::{self, CouponOutcome};
use crate::engine::lifecycle::{advance, record_transition};
use crate::engine::selection::{eta_minutes, nearest_store, rank_riders, RiderCandidate};
use crate::error::AppError;
use crate::geo::{haversine_km, GeoPoint};
use crate::models::event::OrderEvent;
use crate::models::order::{LineItem, Order, OrderStatus};
use crate::models::rider::Rider;
use crate::models::store::Store;
use crate::models::tracking::TrackingEntry;
use crate::state::AppState;

pub struct NewOrder {
    pub customer_address: String,
    pub customer_location: GeoPoint,
    pub items: Vec<LineItem>,
    pub coupon_code: Option<String>,
}

/// Creates an order and assigns it to the nearest active store. When nothing
/// is in range the order is cancelled and the caller gets the actionable
/// no-store error to show the customer.
pub fn place_order(state: &AppState, new_order: NewOrder) -> Result<Order, AppError> {
    let start = Instant::now();

    let quote = cart::quote(&new_order.items, new_order.coupon_code.as_deref());
    let coupon_code = match &quote.coupon {
        Some(CouponOutcome::Applied { code, .. }) => Some(code.clone()),
        Some(CouponOutcome::UnknownCode { code }) => {
            return Err(AppError::BadRequest(format!("unknown coupon code {code}")));
        }
        Some(CouponOutcome::MinimumNotMet { code, required }) => {
            return Err(AppError::BadRequest(format!(
                "coupon {code} needs an order of at least {required}"
            )));
        }
        None => None,
    };

    let now = Utc::now();
    let order = Order {
        id: Uuid::new_v4(),
        customer_address: new_order.customer_address,
        customer_location: new_order.customer_location,
        items: new_order.items,
        subtotal: quote.subtotal,
        delivery_fee: quote.delivery_fee,
        discount: quote.discount,
        total_amount: quote.total,
        coupon_code,
        status: OrderStatus::Pending,
        store_id: None,
        rider_id: None,
        estimated_delivery_time: None,
        actual_delivery_time: None,
        created_at: now,
        updated_at: now,
    };

    state.orders.insert(order.id, order.clone());
    state.metrics.orders_open.inc();
    state.publish(OrderEvent::inserted(&order));
    state.track(TrackingEntry::new(
        order.id,
        OrderStatus::Pending,
        Some("Order placed".to_string()),
        None,
    ));

    let stores: Vec<Store> = state
        .stores
        .iter()
        .map(|entry| entry.value().clone())
        .collect();

    match nearest_store(&stores, &order.customer_location) {
        Some((store, distance_km)) => {
            let store_id = store.id;
            let store_name = store.name.clone();
            let store_location = store.location.clone();

            let updated = {
                let mut stored = state
                    .orders
                    .get_mut(&order.id)
                    .ok_or_else(|| AppError::NotFound(format!("order {} not found", order.id)))?;

                if stored.status != OrderStatus::Pending {
                    return Err(AppError::Conflict(format!(
                        "order {} is no longer pending",
                        order.id
                    )));
                }

                stored.store_id = Some(store_id);
                stored.status = OrderStatus::AssignedToStore;
                stored.updated_at = Utc::now();
                stored.clone()
            };

            record_transition(
                state,
                &updated,
                Some(format!("Order assigned to {store_name}")),
                Some(store_location),
            );

            state
                .metrics
                .orders_placed_total
                .with_label_values(&["assigned"])
                .inc();
            state
                .metrics
                .assignment_latency_seconds
                .with_label_values(&["store"])
                .observe(start.elapsed().as_secs_f64());

            info!(order_id = %updated.id, store_id = %store_id, distance_km, "order assigned to store");
            Ok(updated)
        }
        None => {
            let cancelled = {
                let mut stored = state
                    .orders
                    .get_mut(&order.id)
                    .ok_or_else(|| AppError::NotFound(format!("order {} not found", order.id)))?;

                if stored.status != OrderStatus::Pending {
                    return Err(AppError::Conflict(format!(
                        "order {} is no longer pending",
                        order.id
                    )));
                }

                stored.status = OrderStatus::Cancelled;
                stored.updated_at = Utc::now();
                stored.clone()
            };

            record_transition(
                state,
                &cancelled,
                Some("No store available within the delivery radius".to_string()),
                None,
            );

            state
                .metrics
                .orders_placed_total
                .with_label_values(&["no_store"])
                .inc();
            state
                .metrics
                .assignment_latency_seconds
                .with_label_values(&["store"])
                .observe(start.elapsed().as_secs_f64());

            warn!(order_id = %cancelled.id, "no store within radius; order cancelled");
            Err(AppError::NoStoreInRange)
        }
    }
}

/// Store action: the order is packed. Moves it to ready and immediately tries
/// to hand it to the closest free rider. Calling this on an order that is
/// already ready is the retry path after an earlier rider shortage.
pub fn mark_ready(state: &AppState, order_id: Uuid) -> Result<Order, AppError> {
    let current = {
        let order = state
            .orders
            .get(&order_id)
            .ok_or_else(|| AppError::NotFound(format!("order {} not found", order_id)))?;
        order.status.clone()
    };

    match current {
        OrderStatus::Preparing => {
            advance(
                state,
                order_id,
                OrderStatus::Ready,
                Some("Order prepared and ready for pickup".to_string()),
            )?;
            try_assign_rider(state, order_id)
        }
        OrderStatus::Ready => try_assign_rider(state, order_id),
        other => Err(AppError::InvalidTransition {
            from: other,
            to: OrderStatus::Ready,
        }),
    }
}

/// Walks the store's riders closest-first and claims the first one still
/// available. A candidate snatched by a concurrent assignment is skipped, not
/// an error; running out of candidates leaves the order ready.
pub fn try_assign_rider(state: &AppState, order_id: Uuid) -> Result<Order, AppError> {
    let start = Instant::now();

    let (store_id, customer_location) = {
        let order = state
            .orders
            .get(&order_id)
            .ok_or_else(|| AppError::NotFound(format!("order {} not found", order_id)))?;

        if !order.status.can_advance_to(&OrderStatus::AssignedToRider) {
            return Err(AppError::InvalidTransition {
                from: order.status.clone(),
                to: OrderStatus::AssignedToRider,
            });
        }

        let store_id = order
            .store_id
            .ok_or_else(|| AppError::Internal(format!("order {} has no store", order_id)))?;
        (store_id, order.customer_location.clone())
    };

    let riders: Vec<Rider> = state
        .riders
        .iter()
        .map(|entry| entry.value().clone())
        .collect();

    for candidate in rank_riders(riders, store_id, &customer_location) {
        if !claim_rider(state, candidate.rider.id) {
            continue;
        }

        match commit_rider_assignment(state, order_id, &candidate) {
            Ok(order) => {
                state
                    .metrics
                    .rider_assignments_total
                    .with_label_values(&["assigned"])
                    .inc();
                state
                    .metrics
                    .assignment_latency_seconds
                    .with_label_values(&["rider"])
                    .observe(start.elapsed().as_secs_f64());
                return Ok(order);
            }
            Err(err) => {
                release_rider(state, candidate.rider.id);
                return Err(err);
            }
        }
    }

    state
        .metrics
        .rider_assignments_total
        .with_label_values(&["none_available"])
        .inc();

    warn!(order_id = %order_id, store_id = %store_id, "no available rider for store");
    Err(AppError::NoRiderAvailable)
}

/// Store operator picks a specific rider instead of the automatic closest
/// choice. The rider must deliver for the order's store and still be free.
pub fn assign_rider(state: &AppState, order_id: Uuid, rider_id: Uuid) -> Result<Order, AppError> {
    let (store_id, customer_location) = {
        let order = state
            .orders
            .get(&order_id)
            .ok_or_else(|| AppError::NotFound(format!("order {} not found", order_id)))?;

        if !order.status.can_advance_to(&OrderStatus::AssignedToRider) {
            return Err(AppError::InvalidTransition {
                from: order.status.clone(),
                to: OrderStatus::AssignedToRider,
            });
        }

        let store_id = order
            .store_id
            .ok_or_else(|| AppError::Internal(format!("order {} has no store", order_id)))?;
        (store_id, order.customer_location.clone())
    };

    let rider = state
        .riders
        .get(&rider_id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| AppError::NotFound(format!("rider {} not found", rider_id)))?;

    if rider.store_id != store_id {
        return Err(AppError::BadRequest(format!(
            "rider {} does not deliver for store {}",
            rider_id, store_id
        )));
    }

    if !claim_rider(state, rider_id) {
        return Err(AppError::Conflict(format!("rider {} is not available", rider_id)));
    }

    let distance_km = haversine_km(&rider.location, &customer_location);
    let candidate = RiderCandidate { rider, distance_km };

    match commit_rider_assignment(state, order_id, &candidate) {
        Ok(order) => {
            state
                .metrics
                .rider_assignments_total
                .with_label_values(&["assigned"])
                .inc();
            Ok(order)
        }
        Err(err) => {
            release_rider(state, candidate.rider.id);
            Err(err)
        }
    }
}

/// Rider action: hands the order over and frees the rider for the next one.
pub fn complete_delivery(state: &AppState, order_id: Uuid) -> Result<Order, AppError> {
    let updated = {
        let mut order = state
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| AppError::NotFound(format!("order {} not found", order_id)))?;

        if !order.status.can_advance_to(&OrderStatus::Delivered) {
            return Err(AppError::InvalidTransition {
                from: order.status.clone(),
                to: OrderStatus::Delivered,
            });
        }

        let now = Utc::now();
        order.status = OrderStatus::Delivered;
        order.actual_delivery_time = Some(now);
        order.updated_at = now;
        order.clone()
    };

    if let Some(rider_id) = updated.rider_id {
        release_rider(state, rider_id);
    }

    record_transition(state, &updated, None, None);
    Ok(updated)
}

fn commit_rider_assignment(
    state: &AppState,
    order_id: Uuid,
    candidate: &RiderCandidate,
) -> Result<Order, AppError> {
    let eta = eta_minutes(candidate.distance_km);

    let updated = {
        let mut order = state
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| AppError::NotFound(format!("order {} not found", order_id)))?;

        if order.status != OrderStatus::Ready || order.rider_id.is_some() {
            return Err(AppError::Conflict(format!(
                "order {} was claimed by another assignment",
                order_id
            )));
        }

        order.rider_id = Some(candidate.rider.id);
        order.status = OrderStatus::AssignedToRider;
        order.estimated_delivery_time = Some(Utc::now() + Duration::minutes(eta));
        order.updated_at = Utc::now();
        order.clone()
    };

    record_transition(
        state,
        &updated,
        Some(format!(
            "Assigned to {}. ETA: {} minutes",
            candidate.rider.name, eta
        )),
        Some(candidate.rider.location.clone()),
    );

    info!(
        order_id = %updated.id,
        rider_id = %candidate.rider.id,
        eta_minutes = eta,
        "rider assigned"
    );

    Ok(updated)
}

/// Conditional claim: only an available rider flips to unavailable. Returns
/// false when the rider is gone or already taken, so the caller moves on.
fn claim_rider(state: &AppState, rider_id: Uuid) -> bool {
    if let Some(mut rider) = state.riders.get_mut(&rider_id) {
        if !rider.is_available {
            return false;
        }

        rider.is_available = false;
        rider.updated_at = Utc::now();

        state
            .metrics
            .riders_available
            .with_label_values(&[&rider.store_id.to_string()])
            .dec();
        true
    } else {
        false
    }
}

fn release_rider(state: &AppState, rider_id: Uuid) {
    if let Some(mut rider) = state.riders.get_mut(&rider_id) {
        if !rider.is_available {
            rider.is_available = true;
            rider.updated_at = Utc::now();

            state
                .metrics
                .riders_available
                .with_label_values(&[&rider.store_id.to_string()])
                .inc();
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::{assign_rider, complete_delivery, mark_ready, place_order, NewOrder};
    use crate::engine::lifecycle::advance;
    use crate::error::AppError;
    use crate::geo::GeoPoint;
    use crate::models::order::{LineItem, OrderStatus};
    use crate::models::rider::Rider;
    use crate::models::store::Store;
    use crate::state::AppState;

    const KM_PER_DEG_LAT: f64 = 111.194_926_644_558_73;

    const CUSTOMER: GeoPoint = GeoPoint {
        lat: 12.9716,
        lng: 77.5946,
    };

    fn point_km_north(km: f64) -> GeoPoint {
        GeoPoint {
            lat: CUSTOMER.lat + km / KM_PER_DEG_LAT,
            lng: CUSTOMER.lng,
        }
    }

    fn seed_store(state: &AppState, id_seed: u128, km_north: f64) -> Uuid {
        let id = Uuid::from_u128(id_seed);
        state.stores.insert(
            id,
            Store {
                id,
                name: format!("store-{id_seed}"),
                address: "1 Market Street".to_string(),
                phone: "9000000000".to_string(),
                location: point_km_north(km_north),
                is_active: true,
            },
        );
        id
    }

    fn seed_rider(state: &AppState, id_seed: u128, store_id: Uuid, km_north: f64) -> Uuid {
        let id = Uuid::from_u128(id_seed);
        state.riders.insert(
            id,
            Rider {
                id,
                name: format!("rider-{id_seed}"),
                phone: "9111111111".to_string(),
                store_id,
                location: point_km_north(km_north),
                is_available: true,
                updated_at: Utc::now(),
            },
        );
        id
    }

    fn new_order(coupon_code: Option<&str>) -> NewOrder {
        NewOrder {
            customer_address: "42 Residency Road".to_string(),
            customer_location: CUSTOMER.clone(),
            items: vec![LineItem {
                name: "Fresh Milk".to_string(),
                price: 120.0,
                quantity: 2,
            }],
            coupon_code: coupon_code.map(str::to_string),
        }
    }

    #[test]
    fn placing_an_order_assigns_the_nearest_store() {
        let state = AppState::new(16);
        seed_store(&state, 1, 5.0);
        let near = seed_store(&state, 2, 2.0);

        let order = place_order(&state, new_order(None)).unwrap();
        assert_eq!(order.status, OrderStatus::AssignedToStore);
        assert_eq!(order.store_id, Some(near));
        assert_eq!(order.subtotal, 240.0);
        assert_eq!(order.delivery_fee, 29.0);
        assert_eq!(order.total_amount, 269.0);

        let timeline = state.tracking.get(&order.id).unwrap();
        let notes: Vec<&str> = timeline
            .iter()
            .filter_map(|entry| entry.note.as_deref())
            .collect();
        assert!(notes.contains(&"Order placed"));
        assert!(notes.contains(&"Order assigned to store-2"));
    }

    #[test]
    fn no_store_in_range_cancels_the_order() {
        let state = AppState::new(16);
        seed_store(&state, 1, 9.0);

        let err = place_order(&state, new_order(None)).unwrap_err();
        assert!(matches!(err, AppError::NoStoreInRange));

        let cancelled = state
            .orders
            .iter()
            .next()
            .map(|entry| entry.value().clone())
            .unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert!(cancelled.store_id.is_none());
    }

    #[test]
    fn failing_coupon_rejects_the_checkout() {
        let state = AppState::new(16);
        seed_store(&state, 1, 2.0);

        // Subtotal of 240 misses the FIRST20 minimum of 300.
        let err = place_order(&state, new_order(Some("FIRST20"))).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert!(state.orders.is_empty());
    }

    #[test]
    fn ready_hands_the_order_to_the_closest_rider() {
        let state = AppState::new(16);
        let store = seed_store(&state, 1, 2.0);
        seed_rider(&state, 10, store, 3.0);
        let near = seed_rider(&state, 11, store, 1.0);

        let order = place_order(&state, new_order(None)).unwrap();
        advance(&state, order.id, OrderStatus::Preparing, None).unwrap();

        let assigned = mark_ready(&state, order.id).unwrap();
        assert_eq!(assigned.status, OrderStatus::AssignedToRider);
        assert_eq!(assigned.rider_id, Some(near));
        assert!(assigned.estimated_delivery_time.is_some());

        let rider = state.riders.get(&near).unwrap();
        assert!(!rider.is_available);

        let timeline = state.tracking.get(&order.id).unwrap();
        let eta_note = timeline
            .iter()
            .filter_map(|entry| entry.note.as_deref())
            .find(|note| note.starts_with("Assigned to rider-11"))
            .unwrap();
        // Rider is 1 km out: round(1 * 3 + 10) = 13.
        assert!(eta_note.ends_with("ETA: 13 minutes"));
    }

    #[test]
    fn rider_shortage_leaves_the_order_ready_for_retry() {
        let state = AppState::new(16);
        let store = seed_store(&state, 1, 2.0);

        let order = place_order(&state, new_order(None)).unwrap();
        advance(&state, order.id, OrderStatus::Preparing, None).unwrap();

        let err = mark_ready(&state, order.id).unwrap_err();
        assert!(matches!(err, AppError::NoRiderAvailable));
        assert_eq!(
            state.orders.get(&order.id).unwrap().status,
            OrderStatus::Ready
        );

        // A rider shows up; marking ready again retries the assignment.
        let rider = seed_rider(&state, 10, store, 1.5);
        let assigned = mark_ready(&state, order.id).unwrap();
        assert_eq!(assigned.rider_id, Some(rider));
    }

    #[test]
    fn delivery_frees_the_rider_and_stamps_the_time() {
        let state = AppState::new(16);
        let store = seed_store(&state, 1, 2.0);
        let rider = seed_rider(&state, 10, store, 1.0);

        let order = place_order(&state, new_order(None)).unwrap();
        advance(&state, order.id, OrderStatus::Preparing, None).unwrap();
        mark_ready(&state, order.id).unwrap();
        advance(&state, order.id, OrderStatus::Picked, None).unwrap();

        let delivered = complete_delivery(&state, order.id).unwrap();
        assert_eq!(delivered.status, OrderStatus::Delivered);
        assert!(delivered.actual_delivery_time.is_some());

        assert!(state.riders.get(&rider).unwrap().is_available);
    }

    #[test]
    fn manual_assignment_checks_store_and_availability() {
        let state = AppState::new(16);
        let store = seed_store(&state, 1, 2.0);
        let other_store = seed_store(&state, 2, 3.0);
        let foreign = seed_rider(&state, 10, other_store, 1.0);
        let own = seed_rider(&state, 11, store, 1.0);

        let order = place_order(&state, new_order(None)).unwrap();
        advance(&state, order.id, OrderStatus::Preparing, None).unwrap();
        advance(&state, order.id, OrderStatus::Ready, None).unwrap();

        let err = assign_rider(&state, order.id, foreign).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let assigned = assign_rider(&state, order.id, own).unwrap();
        assert_eq!(assigned.rider_id, Some(own));

        // The same rider cannot be claimed twice.
        let second = place_order(&state, new_order(None)).unwrap();
        advance(&state, second.id, OrderStatus::Preparing, None).unwrap();
        advance(&state, second.id, OrderStatus::Ready, None).unwrap();

        let err = assign_rider(&state, second.id, own).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[test]
    fn unavailable_riders_are_skipped_for_the_next_closest() {
        let state = AppState::new(16);
        let store = seed_store(&state, 1, 2.0);
        let near = seed_rider(&state, 10, store, 1.0);
        let far = seed_rider(&state, 11, store, 4.0);

        state.riders.get_mut(&near).unwrap().is_available = false;

        let order = place_order(&state, new_order(None)).unwrap();
        advance(&state, order.id, OrderStatus::Preparing, None).unwrap();

        let assigned = mark_ready(&state, order.id).unwrap();
        assert_eq!(assigned.rider_id, Some(far));
    }
}
