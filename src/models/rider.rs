use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::GeoPoint;

/// A delivery rider affiliated with a single store. `is_available` is flipped
/// false when an order claims the rider and back to true when the delivery
/// completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rider {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub store_id: Uuid,
    pub location: GeoPoint,
    pub is_available: bool,
    pub updated_at: DateTime<Utc>,
}
