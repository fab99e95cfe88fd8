use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::geo::GeoPoint;
use crate::models::event::OrderEvent;
use crate::models::order::{Order, OrderStatus};
use crate::models::tracking::TrackingEntry;
use crate::state::AppState;

/// Moves an order to `next` if the lifecycle allows it. Returns the updated
/// order so callers can hand it straight back to the client.
pub fn advance(
    state: &AppState,
    order_id: Uuid,
    next: OrderStatus,
    note: Option<String>,
) -> Result<Order, AppError> {
    let updated = {
        let mut order = state
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| AppError::NotFound(format!("order {} not found", order_id)))?;

        if !order.status.can_advance_to(&next) {
            return Err(AppError::InvalidTransition {
                from: order.status.clone(),
                to: next,
            });
        }

        order.status = next;
        order.updated_at = Utc::now();
        order.clone()
    };

    record_transition(state, &updated, note, None);
    Ok(updated)
}

/// Bookkeeping shared by every status write: timeline entry, transition
/// counter, websocket event, open-order gauge. Callers must have released
/// their order guard before calling this.
pub fn record_transition(
    state: &AppState,
    order: &Order,
    note: Option<String>,
    location: Option<GeoPoint>,
) {
    state.track(TrackingEntry::new(
        order.id,
        order.status.clone(),
        note,
        location,
    ));

    state
        .metrics
        .status_transitions_total
        .with_label_values(&[order.status.as_str()])
        .inc();

    if order.status.is_terminal() {
        state.metrics.orders_open.dec();
    }

    state.publish(OrderEvent::updated(order));

    info!(order_id = %order.id, status = %order.status, "order status changed");
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::advance;
    use crate::error::AppError;
    use crate::geo::GeoPoint;
    use crate::models::order::{Order, OrderStatus};
    use crate::state::AppState;

    fn seeded_order(state: &AppState, status: OrderStatus) -> Uuid {
        let id = Uuid::new_v4();
        let now = Utc::now();
        state.orders.insert(
            id,
            Order {
                id,
                customer_address: "7 Test Road".to_string(),
                customer_location: GeoPoint {
                    lat: 12.97,
                    lng: 77.59,
                },
                items: Vec::new(),
                subtotal: 100.0,
                delivery_fee: 29.0,
                discount: 0.0,
                total_amount: 129.0,
                coupon_code: None,
                status,
                store_id: None,
                rider_id: None,
                estimated_delivery_time: None,
                actual_delivery_time: None,
                created_at: now,
                updated_at: now,
            },
        );
        id
    }

    #[test]
    fn advances_along_the_lifecycle() {
        let state = AppState::new(16);
        let id = seeded_order(&state, OrderStatus::AssignedToStore);

        let updated = advance(&state, id, OrderStatus::Preparing, None).unwrap();
        assert_eq!(updated.status, OrderStatus::Preparing);

        let stored = state.orders.get(&id).unwrap();
        assert_eq!(stored.status, OrderStatus::Preparing);
    }

    #[test]
    fn rejects_skipping_states() {
        let state = AppState::new(16);
        let id = seeded_order(&state, OrderStatus::Pending);

        let err = advance(&state, id, OrderStatus::Delivered, None).unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));

        let stored = state.orders.get(&id).unwrap();
        assert_eq!(stored.status, OrderStatus::Pending);
    }

    #[test]
    fn records_a_timeline_entry_per_transition() {
        let state = AppState::new(16);
        let id = seeded_order(&state, OrderStatus::AssignedToStore);

        advance(
            &state,
            id,
            OrderStatus::Preparing,
            Some("Store started preparing".to_string()),
        )
        .unwrap();

        let timeline = state.tracking.get(&id).unwrap();
        assert_eq!(timeline.len(), 1);
        assert_eq!(timeline[0].status, OrderStatus::Preparing);
        assert_eq!(
            timeline[0].note.as_deref(),
            Some("Store started preparing")
        );
    }

    #[test]
    fn unknown_order_is_not_found() {
        let state = AppState::new(16);

        let err = advance(&state, Uuid::new_v4(), OrderStatus::Preparing, None).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
