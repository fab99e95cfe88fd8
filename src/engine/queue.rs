use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::order::{Order, OrderStatus};

const HIGH_AMOUNT_THRESHOLD: f64 = 1000.0;
const HIGH_AGE_MINUTES: i64 = 15;
const MEDIUM_AMOUNT_THRESHOLD: f64 = 500.0;
const MEDIUM_AGE_MINUTES: i64 = 10;

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum PriorityLevel {
    High,
    Medium,
    Low,
}

/// Big tickets and orders that have been waiting too long jump the queue.
pub fn priority_level(total_amount: f64, age_minutes: i64) -> PriorityLevel {
    if total_amount > HIGH_AMOUNT_THRESHOLD || age_minutes > HIGH_AGE_MINUTES {
        PriorityLevel::High
    } else if total_amount > MEDIUM_AMOUNT_THRESHOLD || age_minutes > MEDIUM_AGE_MINUTES {
        PriorityLevel::Medium
    } else {
        PriorityLevel::Low
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QueueEntry {
    pub priority: PriorityLevel,
    pub age_minutes: i64,
    #[serde(flatten)]
    pub order: Order,
}

/// The orders a store is actively working on, highest total first and oldest
/// first within equal totals.
pub fn prep_queue(orders: Vec<Order>, now: DateTime<Utc>) -> Vec<QueueEntry> {
    let mut active: Vec<Order> = orders
        .into_iter()
        .filter(|order| {
            matches!(
                order.status,
                OrderStatus::AssignedToStore | OrderStatus::Preparing
            )
        })
        .collect();

    active.sort_by(|a, b| {
        b.total_amount
            .total_cmp(&a.total_amount)
            .then_with(|| a.created_at.cmp(&b.created_at))
    });

    active
        .into_iter()
        .map(|order| {
            let age_minutes = (now - order.created_at).num_minutes();
            QueueEntry {
                priority: priority_level(order.total_amount, age_minutes),
                age_minutes,
                order,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use super::{prep_queue, priority_level, PriorityLevel};
    use crate::geo::GeoPoint;
    use crate::models::order::{Order, OrderStatus};

    fn order(id_seed: u128, total_amount: f64, minutes_old: i64, status: OrderStatus) -> Order {
        let created_at = Utc::now() - Duration::minutes(minutes_old);
        Order {
            id: Uuid::from_u128(id_seed),
            customer_address: "42 Test Lane".to_string(),
            customer_location: GeoPoint {
                lat: 12.97,
                lng: 77.59,
            },
            items: Vec::new(),
            subtotal: total_amount,
            delivery_fee: 0.0,
            discount: 0.0,
            total_amount,
            coupon_code: None,
            status,
            store_id: Some(Uuid::from_u128(900)),
            rider_id: None,
            estimated_delivery_time: None,
            actual_delivery_time: None,
            created_at,
            updated_at: created_at,
        }
    }

    #[test]
    fn priority_follows_amount_thresholds() {
        assert_eq!(priority_level(1200.0, 0), PriorityLevel::High);
        assert_eq!(priority_level(800.0, 0), PriorityLevel::Medium);
        assert_eq!(priority_level(300.0, 0), PriorityLevel::Low);

        // Thresholds are strict.
        assert_eq!(priority_level(1000.0, 0), PriorityLevel::Medium);
        assert_eq!(priority_level(500.0, 0), PriorityLevel::Low);
    }

    #[test]
    fn waiting_time_escalates_priority() {
        assert_eq!(priority_level(100.0, 16), PriorityLevel::High);
        assert_eq!(priority_level(100.0, 12), PriorityLevel::Medium);
        assert_eq!(priority_level(100.0, 10), PriorityLevel::Low);
    }

    #[test]
    fn queue_sorts_by_total_then_age() {
        let orders = vec![
            order(1, 800.0, 5, OrderStatus::Preparing),
            order(2, 1200.0, 2, OrderStatus::AssignedToStore),
            order(3, 300.0, 20, OrderStatus::AssignedToStore),
            order(4, 800.0, 9, OrderStatus::AssignedToStore),
        ];

        let queue = prep_queue(orders, Utc::now());
        let ids: Vec<Uuid> = queue.iter().map(|entry| entry.order.id).collect();
        assert_eq!(
            ids,
            vec![
                Uuid::from_u128(2),
                Uuid::from_u128(4),
                Uuid::from_u128(1),
                Uuid::from_u128(3),
            ]
        );

        assert_eq!(queue[0].priority, PriorityLevel::High);
        assert_eq!(queue[3].priority, PriorityLevel::High);
    }

    #[test]
    fn queue_only_contains_orders_being_worked_on() {
        let orders = vec![
            order(1, 400.0, 1, OrderStatus::Pending),
            order(2, 400.0, 1, OrderStatus::AssignedToStore),
            order(3, 400.0, 1, OrderStatus::Ready),
            order(4, 400.0, 1, OrderStatus::Delivered),
        ];

        let queue = prep_queue(orders, Utc::now());
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].order.id, Uuid::from_u128(2));
    }
}
