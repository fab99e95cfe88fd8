use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::GeoPoint;
use crate::models::order::OrderStatus;

/// One row of an order's timeline. Appended on every status change and never
/// rewritten.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingEntry {
    pub order_id: Uuid,
    pub status: OrderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    pub recorded_at: DateTime<Utc>,
}

impl TrackingEntry {
    pub fn new(
        order_id: Uuid,
        status: OrderStatus,
        note: Option<String>,
        location: Option<GeoPoint>,
    ) -> Self {
        Self {
            order_id,
            status,
            note,
            location,
            recorded_at: Utc::now(),
        }
    }
}
