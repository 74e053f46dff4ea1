//! Server metrics
//!
//! OpenTelemetry instruments recorded by the dispatcher and the HTTP binding
//! when observability is enabled through `ServerBuilder::with_observability()`.
//!
//! # Metrics Collected
//!
//! - **jrpc.server.http.requests**: HTTP exchanges by verb (counter)
//! - **jrpc.server.requests.total**: dispatched calls and notifications, by
//!   method and status (counter)
//! - **jrpc.server.request.duration**: handler latency in seconds (histogram)
//! - **jrpc.server.batch.size**: items per batch payload (histogram)
//! - **jrpc.server.errors.total**: error responses by symbolic code (counter)
//!
//! # Examples
//!
//! ```rust,no_run
//! use jrpc_server::ServerMetrics;
//!
//! let metrics = ServerMetrics::new("orders-rpc");
//! metrics.record_request("orders.create", "success", 0.012);
//! metrics.record_error("E_JSONRPC20_METHOD_NOT_FOUND");
//! ```

use opentelemetry::{
    global,
    metrics::{Counter, Histogram, Meter},
    KeyValue,
};

/// OpenTelemetry instruments of a server
pub struct ServerMetrics {
    /// HTTP exchanges handled
    pub http_requests: Counter<u64>,
    /// Calls and notifications dispatched
    pub requests_total: Counter<u64>,
    /// Handler latency in seconds
    pub request_duration: Histogram<f64>,
    /// Items per batch payload
    pub batch_size: Histogram<u64>,
    /// Error responses produced
    pub errors_total: Counter<u64>,
}

impl ServerMetrics {
    /// Instruments on the global meter named after the service
    pub fn new(service_name: impl Into<String>) -> Self {
        let name: &'static str = Box::leak(service_name.into().into_boxed_str());
        let meter = global::meter(name);
        Self::new_with_meter(&meter)
    }

    /// Instruments on a caller-provided meter
    pub fn new_with_meter(meter: &Meter) -> Self {
        Self {
            http_requests: meter
                .u64_counter("jrpc.server.http.requests")
                .with_description("HTTP exchanges handled by the JSON-RPC endpoint")
                .build(),
            requests_total: meter
                .u64_counter("jrpc.server.requests.total")
                .with_description("Calls and notifications dispatched")
                .build(),
            request_duration: meter
                .f64_histogram("jrpc.server.request.duration")
                .with_description("Handler latency in seconds")
                .build(),
            batch_size: meter
                .u64_histogram("jrpc.server.batch.size")
                .with_description("Number of items in batch payloads")
                .build(),
            errors_total: meter
                .u64_counter("jrpc.server.errors.total")
                .with_description("Error responses produced")
                .build(),
        }
    }

    /// Record one HTTP exchange
    pub fn record_http(&self, verb: &str) {
        self.http_requests
            .add(1, &[KeyValue::new("verb", verb.to_string())]);
    }

    /// Record one dispatched item
    pub fn record_request(&self, method: &str, status: &str, duration_secs: f64) {
        let attributes = &[
            KeyValue::new("method", method.to_string()),
            KeyValue::new("status", status.to_string()),
        ];
        self.requests_total.add(1, attributes);
        self.request_duration.record(duration_secs, attributes);
    }

    /// Record the size of a batch payload
    pub fn record_batch(&self, size: u64, mode: &str) {
        self.batch_size
            .record(size, &[KeyValue::new("mode", mode.to_string())]);
    }

    /// Record an error response
    pub fn record_error(&self, symbol: &str) {
        self.errors_total
            .add(1, &[KeyValue::new("code", symbol.to_string())]);
    }
}
