//! Logging, tracing and metrics bootstrap
//!
//! jrpc logs through the `tracing` crate everywhere: the dispatcher, the HTTP
//! binding and the client engine emit spans and structured events. Nothing is
//! printed until the application installs a subscriber, either its own or the
//! one assembled by [`init_observability`]:
//!
//! - an `EnvFilter` driven by `RUST_LOG` (falling back to the configured level)
//! - a `fmt` layer writing JSON lines or human-readable text
//! - optionally, a `tracing-opentelemetry` layer exporting spans over OTLP
//! - optionally, a global OpenTelemetry meter provider exporting the
//!   `jrpc.server.*` and `jrpc.client.*` instruments over OTLP
//!
//! # Usage
//!
//! ```rust,no_run
//! use jrpc_core::{LogFormat, ObservabilityConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ObservabilityConfig::new("billing-rpc")
//!         .with_endpoint("http://localhost:4317")
//!         .with_log_format(LogFormat::Text)
//!         .with_log_level("debug");
//!
//!     jrpc_core::init_observability(config).expect("telemetry");
//!
//!     // ... serve requests ...
//!
//!     jrpc_core::shutdown_observability();
//! }
//! ```
//!
//! # Environment Variables
//!
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: collector endpoint
//! - `RUST_LOG`: filter directives (e.g. `info,jrpc_server=debug`)

use crate::error::{Error, Result};
use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::Resource;
use std::sync::Mutex;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Output format of the local log stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per event
    #[default]
    Json,
    /// Human-readable single-line events
    Text,
}

/// Observability configuration
///
/// # Defaults
///
/// - service name `jrpc`, version of this crate
/// - OTLP endpoint from `OTEL_EXPORTER_OTLP_ENDPOINT`, else `http://localhost:4317`
/// - traces and metrics exported, JSON logs
/// - log level from `RUST_LOG`, else `info`
/// - metrics exported every 30 seconds
///
/// # Examples
///
/// ```rust
/// use jrpc_core::{LogFormat, ObservabilityConfig};
///
/// let config = ObservabilityConfig::new("rpc-gateway")
///     .with_traces(false)
///     .with_log_format(LogFormat::Text);
///
/// assert_eq!(config.service_name, "rpc-gateway");
/// assert!(!config.enable_traces);
/// ```
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Reported as `service.name`
    pub service_name: String,
    /// Reported as `service.version`
    pub service_version: String,
    /// gRPC endpoint of the OTLP collector
    pub otlp_endpoint: String,
    /// Export spans over OTLP
    pub enable_traces: bool,
    /// Export metrics over OTLP
    pub enable_metrics: bool,
    /// Filter used when `RUST_LOG` is not set
    pub log_level: String,
    /// Local log output format
    pub log_format: LogFormat,
    /// Metrics export period
    pub metrics_interval: Duration,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            service_name: "jrpc".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            otlp_endpoint: std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
                .unwrap_or_else(|_| "http://localhost:4317".to_string()),
            enable_traces: true,
            enable_metrics: true,
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            log_format: LogFormat::default(),
            metrics_interval: Duration::from_secs(30),
        }
    }
}

impl ObservabilityConfig {
    /// Configuration with a custom service name and defaults elsewhere
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            ..Default::default()
        }
    }

    /// Local logging only: no OTLP exporter is created
    pub fn local(service_name: impl Into<String>) -> Self {
        Self::new(service_name).with_traces(false).with_metrics(false)
    }

    /// Set the OTLP collector endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.otlp_endpoint = endpoint.into();
        self
    }

    /// Set the fallback log filter
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Set the reported service version
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.service_version = version.into();
        self
    }

    /// Enable or disable span export
    pub fn with_traces(mut self, enable: bool) -> Self {
        self.enable_traces = enable;
        self
    }

    /// Enable or disable metrics export
    pub fn with_metrics(mut self, enable: bool) -> Self {
        self.enable_metrics = enable;
        self
    }

    /// Choose JSON or text log lines
    pub fn with_log_format(mut self, format: LogFormat) -> Self {
        self.log_format = format;
        self
    }

    /// Set the metrics export period
    pub fn with_metrics_interval(mut self, interval: Duration) -> Self {
        self.metrics_interval = interval;
        self
    }

    fn resource(&self) -> Resource {
        Resource::builder_empty()
            .with_attributes(vec![
                KeyValue::new(
                    opentelemetry_semantic_conventions::resource::SERVICE_NAME,
                    self.service_name.clone(),
                ),
                KeyValue::new(
                    opentelemetry_semantic_conventions::resource::SERVICE_VERSION,
                    self.service_version.clone(),
                ),
            ])
            .build()
    }
}

/// Providers kept alive until [`shutdown_observability`]
struct Providers {
    tracer: Option<opentelemetry_sdk::trace::SdkTracerProvider>,
    meter: Option<opentelemetry_sdk::metrics::SdkMeterProvider>,
}

impl Providers {
    fn shutdown(self) {
        if let Some(tracer) = self.tracer {
            if let Err(e) = tracer.shutdown() {
                tracing::warn!(error = %e, "Tracer provider shutdown failed");
            }
        }
        if let Some(meter) = self.meter {
            if let Err(e) = meter.shutdown() {
                tracing::warn!(error = %e, "Meter provider shutdown failed");
            }
        }
    }
}

static PROVIDERS: Mutex<Option<Providers>> = Mutex::new(None);

/// Install the global subscriber and the OpenTelemetry providers
///
/// Must be called at most once per process, from within a tokio runtime when
/// traces or metrics are enabled (the OTLP exporters run on it).
///
/// # Errors
///
/// `Error::Internal` when an exporter cannot be built, the log filter is
/// invalid, or a global subscriber is already installed.
pub fn init_observability(config: ObservabilityConfig) -> Result<()> {
    let providers = Providers {
        tracer: config
            .enable_traces
            .then(|| build_tracer_provider(&config))
            .transpose()?,
        meter: config
            .enable_metrics
            .then(|| build_meter_provider(&config))
            .transpose()?,
    };

    let telemetry_layer = providers.tracer.as_ref().map(|provider| {
        use opentelemetry::trace::TracerProvider as _;
        tracing_opentelemetry::layer().with_tracer(provider.tracer(config.service_name.clone()))
    });

    let installed = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| Error::Internal(format!("invalid log filter: {}", e)))
        .and_then(|env_filter| {
            let fmt_layer = match config.log_format {
                LogFormat::Json => tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_line_number(true)
                    .json()
                    .boxed(),
                LogFormat::Text => tracing_subscriber::fmt::layer().with_target(true).boxed(),
            };

            tracing_subscriber::registry()
                .with(telemetry_layer)
                .with(env_filter)
                .with(fmt_layer)
                .try_init()
                .map_err(|e| Error::Internal(format!("tracing subscriber: {}", e)))
        });

    // Globals are only replaced once the subscriber is in place
    if let Err(e) = installed {
        providers.shutdown();
        return Err(e);
    }

    if let Some(tracer) = &providers.tracer {
        global::set_tracer_provider(tracer.clone());
    }
    if let Some(meter) = &providers.meter {
        global::set_meter_provider(meter.clone());
    }

    if let Ok(mut slot) = PROVIDERS.lock() {
        *slot = Some(providers);
    }

    tracing::info!(
        service_name = %config.service_name,
        otlp_endpoint = %config.otlp_endpoint,
        traces = config.enable_traces,
        metrics = config.enable_metrics,
        "Observability initialized"
    );

    Ok(())
}

fn build_tracer_provider(
    config: &ObservabilityConfig,
) -> Result<opentelemetry_sdk::trace::SdkTracerProvider> {
    use opentelemetry_sdk::trace::{RandomIdGenerator, Sampler};

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(config.otlp_endpoint.clone())
        .build()
        .map_err(|e| Error::Internal(format!("span exporter: {}", e)))?;

    Ok(opentelemetry_sdk::trace::SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(config.resource())
        .with_sampler(Sampler::AlwaysOn)
        .with_id_generator(RandomIdGenerator::default())
        .build())
}

fn build_meter_provider(
    config: &ObservabilityConfig,
) -> Result<opentelemetry_sdk::metrics::SdkMeterProvider> {
    let exporter = opentelemetry_otlp::MetricExporter::builder()
        .with_tonic()
        .with_endpoint(config.otlp_endpoint.clone())
        .build()
        .map_err(|e| Error::Internal(format!("metric exporter: {}", e)))?;

    let reader = opentelemetry_sdk::metrics::PeriodicReader::builder(exporter)
        .with_interval(config.metrics_interval)
        .build();

    Ok(opentelemetry_sdk::metrics::SdkMeterProvider::builder()
        .with_reader(reader)
        .with_resource(config.resource())
        .build())
}

/// Flush and shut down the providers installed by [`init_observability`]
///
/// Safe to call several times, and when nothing was initialized.
pub fn shutdown_observability() {
    let providers = PROVIDERS.lock().ok().and_then(|mut slot| slot.take());
    let Some(providers) = providers else {
        return;
    };

    tracing::info!("Shutting down observability");
    providers.shutdown();
}
