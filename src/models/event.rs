use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::order::{Order, OrderStatus};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum OrderEventKind {
    Inserted,
    Updated,
}

/// Broadcast to websocket subscribers whenever an order is created or changes
/// status. Carries enough for a dashboard to decide whether to refetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderEvent {
    pub kind: OrderEventKind,
    pub order_id: Uuid,
    pub store_id: Option<Uuid>,
    pub rider_id: Option<Uuid>,
    pub status: OrderStatus,
    pub at: DateTime<Utc>,
}

impl OrderEvent {
    pub fn inserted(order: &Order) -> Self {
        Self::from_order(OrderEventKind::Inserted, order)
    }

    pub fn updated(order: &Order) -> Self {
        Self::from_order(OrderEventKind::Updated, order)
    }

    fn from_order(kind: OrderEventKind, order: &Order) -> Self {
        Self {
            kind,
            order_id: order.id,
            store_id: order.store_id,
            rider_id: order.rider_id,
            status: order.status.clone(),
            at: Utc::now(),
        }
    }
}
