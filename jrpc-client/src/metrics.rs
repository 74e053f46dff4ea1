//! Client metrics definitions
//!
//! OpenTelemetry instruments recorded by [`JrpcClient`](crate::JrpcClient)
//! when observability is enabled through
//! [`ClientBuilder::with_observability`](crate::ClientBuilder::with_observability).
//!
//! # Metrics Collected
//!
//! - **jrpc.client.requests.total**: calls sent, by method and status (counter)
//! - **jrpc.client.request.duration**: call round-trip in seconds (histogram)
//! - **jrpc.client.notifications.total**: notifications sent (counter)
//! - **jrpc.client.batch.size**: entries per executed batch (histogram)
//! - **jrpc.client.errors.total**: failures by error symbol (counter)
//!
//! # Examples
//!
//! ```rust,no_run
//! use jrpc_client::ClientMetrics;
//!
//! let metrics = ClientMetrics::new("my-client");
//! metrics.record_request("sum", "success", 0.004);
//! ```

use opentelemetry::{
    global,
    metrics::{Counter, Histogram, Meter},
    KeyValue,
};

/// Client metrics for monitoring
pub struct ClientMetrics {
    /// Total number of calls sent
    pub requests_total: Counter<u64>,
    /// Call duration in seconds
    pub request_duration: Histogram<f64>,
    /// Total number of notifications sent
    pub notifications_total: Counter<u64>,
    /// Batch size distribution
    pub batch_size: Histogram<u64>,
    /// Total number of errors
    pub errors_total: Counter<u64>,
}

impl ClientMetrics {
    /// Create metrics on the global meter provider
    pub fn new(service_name: impl Into<String>) -> Self {
        let name: &'static str = Box::leak(service_name.into().into_boxed_str());
        let meter = global::meter(name);
        Self::new_with_meter(&meter)
    }

    /// Create metrics on a custom meter
    pub fn new_with_meter(meter: &Meter) -> Self {
        Self {
            requests_total: meter
                .u64_counter("jrpc.client.requests.total")
                .with_description("Total number of calls sent")
                .build(),
            request_duration: meter
                .f64_histogram("jrpc.client.request.duration")
                .with_description("Call round-trip duration in seconds")
                .build(),
            notifications_total: meter
                .u64_counter("jrpc.client.notifications.total")
                .with_description("Total number of notifications sent")
                .build(),
            batch_size: meter
                .u64_histogram("jrpc.client.batch.size")
                .with_description("Number of entries in executed batches")
                .build(),
            errors_total: meter
                .u64_counter("jrpc.client.errors.total")
                .with_description("Total number of errors encountered")
                .build(),
        }
    }

    /// Record a completed call
    pub fn record_request(&self, method: &str, status: &str, duration_secs: f64) {
        let attributes = &[
            KeyValue::new("method", method.to_string()),
            KeyValue::new("status", status.to_string()),
        ];
        self.requests_total.add(1, attributes);
        self.request_duration.record(duration_secs, attributes);
    }

    /// Record a sent notification
    pub fn record_notification(&self, method: &str) {
        self.notifications_total
            .add(1, &[KeyValue::new("method", method.to_string())]);
    }

    /// Record an executed batch
    pub fn record_batch(&self, size: u64) {
        self.batch_size.record(size, &[]);
    }

    /// Record an error
    pub fn record_error(&self, error_type: &str) {
        self.errors_total
            .add(1, &[KeyValue::new("error_type", error_type.to_string())]);
    }
}
