use uuid::Uuid;

use crate::geo::{haversine_km, GeoPoint};
use crate::models::rider::Rider;
use crate::models::store::Store;

const STORE_ASSIGNMENT_RADIUS_KM: f64 = 7.0;

const ETA_MINUTES_PER_KM: f64 = 3.0;
const ETA_PREP_MINUTES: f64 = 10.0;

/// Closest active store within the assignment radius, with its distance to
/// the customer. Ties keep the earlier candidate in scan order.
pub fn nearest_store<'a>(stores: &'a [Store], customer: &GeoPoint) -> Option<(&'a Store, f64)> {
    let mut nearest: Option<(&'a Store, f64)> = None;

    for store in stores.iter().filter(|store| store.is_active) {
        let distance_km = haversine_km(&store.location, customer);
        if distance_km > STORE_ASSIGNMENT_RADIUS_KM {
            continue;
        }

        let closer = match nearest {
            Some((_, best_km)) => distance_km < best_km,
            None => true,
        };
        if closer {
            nearest = Some((store, distance_km));
        }
    }

    nearest
}

#[derive(Debug, Clone)]
pub struct RiderCandidate {
    pub rider: Rider,
    pub distance_km: f64,
}

/// Available riders of one store, closest to the customer first. Unlike store
/// selection there is no radius cap: a far rider is better than none.
pub fn rank_riders(riders: Vec<Rider>, store_id: Uuid, customer: &GeoPoint) -> Vec<RiderCandidate> {
    let mut candidates: Vec<RiderCandidate> = riders
        .into_iter()
        .filter(|rider| rider.store_id == store_id && rider.is_available)
        .map(|rider| {
            let distance_km = haversine_km(&rider.location, customer);
            RiderCandidate { rider, distance_km }
        })
        .collect();

    candidates.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    candidates
}

/// Estimated delivery minutes: 3 min per km of rider travel plus a flat
/// 10 min pickup allowance.
pub fn eta_minutes(distance_km: f64) -> i64 {
    (distance_km * ETA_MINUTES_PER_KM + ETA_PREP_MINUTES).round() as i64
}
