use dashmap::DashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::event::OrderEvent;
use crate::models::order::Order;
use crate::models::rider::Rider;
use crate::models::store::Store;
use crate::models::tracking::TrackingEntry;
use crate::observability::metrics::Metrics;

pub struct AppState {
    pub stores: DashMap<Uuid, Store>,
    pub riders: DashMap<Uuid, Rider>,
    pub orders: DashMap<Uuid, Order>,
    pub tracking: DashMap<Uuid, Vec<TrackingEntry>>,
    pub order_events_tx: broadcast::Sender<OrderEvent>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(event_buffer_size: usize) -> Self {
        let (order_events_tx, _unused_rx) = broadcast::channel(event_buffer_size);

        Self {
            stores: DashMap::new(),
            riders: DashMap::new(),
            orders: DashMap::new(),
            tracking: DashMap::new(),
            order_events_tx,
            metrics: Metrics::new(),
        }
    }

    pub fn publish(&self, event: OrderEvent) {
        let _ = self.order_events_tx.send(event);
    }

    pub fn track(&self, entry: TrackingEntry) {
        self.tracking.entry(entry.order_id).or_default().push(entry);
    }
}
