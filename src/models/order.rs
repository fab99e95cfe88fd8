use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use crate::geo::GeoPoint;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    AssignedToStore,
    Preparing,
    Ready,
    AssignedToRider,
    Picked,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::AssignedToStore => "assigned_to_store",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::AssignedToRider => "assigned_to_rider",
            OrderStatus::Picked => "picked",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// The forward-only lifecycle. Cancellation is allowed only while no store
    /// has started working on the order.
    pub fn can_advance_to(&self, next: &OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Pending, OrderStatus::AssignedToStore)
                | (OrderStatus::Pending, OrderStatus::Cancelled)
                | (OrderStatus::AssignedToStore, OrderStatus::Preparing)
                | (OrderStatus::AssignedToStore, OrderStatus::Cancelled)
                | (OrderStatus::Preparing, OrderStatus::Ready)
                | (OrderStatus::Ready, OrderStatus::AssignedToRider)
                | (OrderStatus::AssignedToRider, OrderStatus::Picked)
                | (OrderStatus::Picked, OrderStatus::Delivered)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineItem {
    pub name: String,
    pub price: f64,
    pub quantity: u32,
}

/// Decodes stored line items. Accepts the current representation (a JSON
/// array) and the legacy one (a JSON-encoded string of that array); anything
/// unreadable becomes an empty list with a warning instead of an error, so a
/// bad row never takes a view down.
pub fn parse_line_items(raw: &Value) -> Vec<LineItem> {
    let parsed = match raw {
        Value::String(encoded) => {
            serde_json::from_str::<Vec<LineItem>>(encoded).map_err(|err| err.to_string())
        }
        other => serde_json::from_value::<Vec<LineItem>>(other.clone()).map_err(|err| err.to_string()),
    };

    match parsed {
        Ok(items) => items,
        Err(err) => {
            warn!(error = %err, "unparsable line items; falling back to empty list");
            Vec::new()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub customer_address: String,
    pub customer_location: GeoPoint,
    pub items: Vec<LineItem>,
    pub subtotal: f64,
    pub delivery_fee: f64,
    pub discount: f64,
    pub total_amount: f64,
    pub coupon_code: Option<String>,
    pub status: OrderStatus,
    pub store_id: Option<Uuid>,
    pub rider_id: Option<Uuid>,
    pub estimated_delivery_time: Option<DateTime<Utc>>,
    pub actual_delivery_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
