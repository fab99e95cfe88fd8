use prometheus::{
    Encoder, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub orders_placed_total: IntCounterVec,
    pub rider_assignments_total: IntCounterVec,
    pub status_transitions_total: IntCounterVec,
    pub assignment_latency_seconds: HistogramVec,
    pub orders_open: IntGauge,
    pub riders_available: IntGaugeVec,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let orders_placed_total = IntCounterVec::new(
            Opts::new("orders_placed_total", "Orders placed by outcome"),
            &["outcome"],
        )
        .expect("valid orders_placed_total metric");

        let rider_assignments_total = IntCounterVec::new(
            Opts::new("rider_assignments_total", "Rider assignments by outcome"),
            &["outcome"],
        )
        .expect("valid rider_assignments_total metric");

        let status_transitions_total = IntCounterVec::new(
            Opts::new("status_transitions_total", "Order status transitions"),
            &["status"],
        )
        .expect("valid status_transitions_total metric");

        let assignment_latency_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "assignment_latency_seconds",
                "Latency of store and rider selection in seconds",
            ),
            &["kind"],
        )
        .expect("valid assignment_latency_seconds metric");

        let orders_open = IntGauge::new("orders_open", "Orders not yet delivered or cancelled")
            .expect("valid orders_open metric");

        let riders_available = IntGaugeVec::new(
            Opts::new("riders_available", "Available riders per store"),
            &["store_id"],
        )
        .expect("valid riders_available metric");

        registry
            .register(Box::new(orders_placed_total.clone()))
            .expect("register orders_placed_total");
        registry
            .register(Box::new(rider_assignments_total.clone()))
            .expect("register rider_assignments_total");
        registry
            .register(Box::new(status_transitions_total.clone()))
            .expect("register status_transitions_total");
        registry
            .register(Box::new(assignment_latency_seconds.clone()))
            .expect("register assignment_latency_seconds");
        registry
            .register(Box::new(orders_open.clone()))
            .expect("register orders_open");
        registry
            .register(Box::new(riders_available.clone()))
            .expect("register riders_available");

        Self {
            registry,
            orders_placed_total,
            rider_assignments_total,
            status_transitions_total,
            assignment_latency_seconds,
            orders_open,
            riders_available,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}
