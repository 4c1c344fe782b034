//! # Telemetry Features
//!
//! Console logging through `tracing-subscriber` is always on. OpenTelemetry
//! export is opt-in through cargo features.
//!
//! ## Feature matrix
//!
//! - `tracing`: Exports spans (one per worker, one per RPC) via OpenTelemetry.
//! - `metrics`: Exports hub metrics (connections, prompts, stops, deliveries).
//! - `otlp`: Enables the OTLP/gRPC exporter.
//! - `stdout`: Enables the stdout exporter.
//!
//! ## Feature constraints
//!
//! - Exporters require at least one of `tracing` or `metrics`.
//! - `otlp` and `stdout` can be enabled together.
//!
//! ## OTLP configuration
//!
//! - `OTEL_EXPORTER_OTLP_ENDPOINT` (required), e.g. `https://collector:4317`.
//!   TLS with native roots is used for `https` endpoints.
//! - `OTEL_EXPORTER_OTLP_HEADERS` (optional), `key=value` pairs separated by
//!   commas, sent as gRPC metadata.
//! - `OTEL_EXPORTER_OTLP_COMPRESSION` (optional), `gzip` or `zstd`.
//!
//! ## Example usage
//!
//! ```bash
//! cargo run --features tracing,metrics,otlp
//! cargo run --features tracing,stdout
//! ```

#[cfg(all(feature = "otlp", not(any(feature = "tracing", feature = "metrics"))))]
compile_error!("The 'otlp' feature requires at least one of 'tracing' or 'metrics' to be enabled.");

#[cfg(all(feature = "stdout", not(any(feature = "tracing", feature = "metrics"))))]
compile_error!(
    "The 'stdout' feature requires at least one of 'tracing' or 'metrics' to be enabled."
);

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(all(feature = "otlp", any(feature = "metrics", feature = "tracing")))]
use opentelemetry_otlp::{Compression, Protocol, WithExportConfig, WithTonicConfig};
#[cfg(all(feature = "otlp", feature = "metrics"))]
use opentelemetry_sdk::metrics::Temporality;
#[cfg(all(feature = "otlp", any(feature = "metrics", feature = "tracing")))]
use tonic::{metadata::MetadataMap, transport::ClientTlsConfig};

#[cfg(feature = "metrics")]
use opentelemetry::metrics::{Counter, Meter, UpDownCounter};
#[cfg(feature = "metrics")]
use opentelemetry_sdk::metrics as sdkmetrics;
#[cfg(feature = "metrics")]
use std::sync::OnceLock;

#[cfg(any(feature = "metrics", feature = "tracing"))]
use opentelemetry::{InstrumentationScope, KeyValue};
#[cfg(any(feature = "metrics", feature = "tracing"))]
use opentelemetry_sdk::Resource;
#[cfg(any(feature = "metrics", feature = "tracing"))]
use opentelemetry_semantic_conventions as semvcns;

#[cfg(feature = "tracing")]
use opentelemetry::trace::TracerProvider;
#[cfg(feature = "tracing")]
use opentelemetry_sdk::propagation::TraceContextPropagator;
#[cfg(feature = "tracing")]
use opentelemetry_sdk::trace as sdktrace;

const SERVICE_NAME: &str = "sessionq";

pub struct TelemetryProviders {
    #[cfg(feature = "tracing")]
    pub tracer_provider: sdktrace::SdkTracerProvider,
    #[cfg(feature = "metrics")]
    pub meter_provider: sdkmetrics::SdkMeterProvider,
}

impl TelemetryProviders {
    /// Flushes and shuts down every exporter. Errors are reported on stderr
    /// since the subscriber may already be unusable.
    pub fn shutdown(&self) {
        #[cfg(feature = "tracing")]
        {
            if let Err(err) = self.tracer_provider.force_flush() {
                eprintln!("Error flushing traces: {err:#?}");
            }
            if let Err(err) = self.tracer_provider.shutdown() {
                eprintln!("Error shutting down tracer: {err:#?}");
            }
        }

        #[cfg(feature = "metrics")]
        {
            if let Err(err) = self.meter_provider.force_flush() {
                eprintln!("Error flushing metrics: {err:#?}");
            }
            if let Err(err) = self.meter_provider.shutdown() {
                eprintln!("Error shutting down meter: {err:#?}");
            }
        }
    }
}

pub fn init_telemetry() -> anyhow::Result<TelemetryProviders> {
    #[cfg(feature = "tracing")]
    opentelemetry::global::set_text_map_propagator(TraceContextPropagator::new());

    #[cfg(feature = "tracing")]
    let tracer_provider = init_tracer()?;

    #[cfg(feature = "metrics")]
    let meter_provider = init_metrics()?;

    #[cfg(any(feature = "metrics", feature = "tracing"))]
    let scope = InstrumentationScope::builder(SERVICE_NAME)
        .with_version(env!("CARGO_PKG_VERSION"))
        .with_schema_url(semvcns::SCHEMA_URL)
        .build();

    // Console output is independent of any exporter.
    let registry = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_thread_ids(true)
                .with_line_number(true)
                .with_target(false)
                .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
                .with_file(true)
                .pretty(),
        );

    #[cfg(feature = "tracing")]
    let registry = {
        opentelemetry::global::set_tracer_provider(tracer_provider.clone());
        registry.with(
            tracing_opentelemetry::layer()
                .with_tracer(tracer_provider.tracer_with_scope(scope.clone()))
                .with_error_records_to_exceptions(true),
        )
    };

    #[cfg(feature = "metrics")]
    let registry = {
        opentelemetry::global::set_meter_provider(meter_provider.clone());
        let meter = opentelemetry::global::meter_with_scope(scope);
        init_metric_handles(&meter);

        registry.with(tracing_opentelemetry::MetricsLayer::new(
            meter_provider.clone(),
        ))
    };

    registry.init();

    Ok(TelemetryProviders {
        #[cfg(feature = "tracing")]
        tracer_provider,
        #[cfg(feature = "metrics")]
        meter_provider,
    })
}

#[cfg(all(feature = "otlp", any(feature = "metrics", feature = "tracing")))]
struct OtlpSettings {
    endpoint: String,
    metadata: MetadataMap,
    compression: Option<Compression>,
}

#[cfg(all(feature = "otlp", any(feature = "metrics", feature = "tracing")))]
impl OtlpSettings {
    fn from_env() -> anyhow::Result<Self> {
        use anyhow::Context;
        use std::str::FromStr;
        use tonic::metadata::{AsciiMetadataKey, AsciiMetadataValue};

        let endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
            .context("missing `OTEL_EXPORTER_OTLP_ENDPOINT`")?;

        let mut metadata = MetadataMap::new();
        if let Ok(headers) = std::env::var("OTEL_EXPORTER_OTLP_HEADERS") {
            for pair in headers.split(',').filter(|p| !p.trim().is_empty()) {
                let (key, value) = pair
                    .split_once('=')
                    .with_context(|| format!("malformed OTLP header `{pair}`"))?;
                metadata.insert(
                    AsciiMetadataKey::from_str(&key.trim().to_ascii_lowercase())
                        .context("invalid OTLP header name")?,
                    AsciiMetadataValue::from_str(value.trim())
                        .context("invalid OTLP header value")?,
                );
            }
        }

        let compression = match std::env::var("OTEL_EXPORTER_OTLP_COMPRESSION") {
            Ok(raw) => Some(Compression::from_str(&raw.to_ascii_lowercase())?),
            Err(_) => None,
        };

        Ok(Self {
            endpoint,
            metadata,
            compression,
        })
    }

    fn uses_tls(&self) -> bool {
        self.endpoint.starts_with("https://")
    }
}

#[cfg(any(feature = "metrics", feature = "tracing"))]
fn resource() -> Resource {
    Resource::builder()
        .with_service_name(SERVICE_NAME)
        .with_schema_url(
            [KeyValue::new(
                semvcns::resource::SERVICE_VERSION,
                env!("CARGO_PKG_VERSION"),
            )],
            semvcns::SCHEMA_URL,
        )
        .build()
}

#[cfg(feature = "metrics")]
fn init_metrics() -> anyhow::Result<sdkmetrics::SdkMeterProvider> {
    let builder = sdkmetrics::SdkMeterProvider::builder().with_resource(resource());

    #[cfg(feature = "stdout")]
    let builder = {
        use opentelemetry_stdout::MetricExporter;
        let exporter = MetricExporter::default();
        let reader = opentelemetry_sdk::metrics::PeriodicReader::builder(exporter)
            .with_interval(std::time::Duration::from_secs(5))
            .build();

        builder.with_reader(reader)
    };

    #[cfg(feature = "otlp")]
    let builder = {
        use anyhow::Context;

        let settings = OtlpSettings::from_env()?;
        let mut exporter = opentelemetry_otlp::MetricExporter::builder()
            .with_tonic()
            .with_metadata(settings.metadata.clone())
            .with_timeout(std::time::Duration::from_secs(10))
            .with_endpoint(settings.endpoint.clone())
            .with_protocol(Protocol::Grpc)
            .with_temporality(Temporality::Delta);
        if settings.uses_tls() {
            exporter = exporter.with_tls_config(ClientTlsConfig::new().with_native_roots());
        }
        if let Some(compression) = settings.compression {
            exporter = exporter.with_compression(compression);
        }
        let exporter = exporter
            .build()
            .context("failed to build metrics exporter")?;

        builder.with_periodic_exporter(exporter)
    };

    Ok(builder.build())
}

#[cfg(feature = "tracing")]
fn init_tracer() -> anyhow::Result<sdktrace::SdkTracerProvider> {
    let builder = sdktrace::SdkTracerProvider::builder().with_resource(resource());

    #[cfg(feature = "stdout")]
    let builder = {
        use opentelemetry_stdout::SpanExporter;
        let exporter = SpanExporter::default();
        let batch = sdktrace::BatchSpanProcessor::builder(exporter)
            .with_batch_config(
                sdktrace::BatchConfigBuilder::default()
                    .with_scheduled_delay(std::time::Duration::from_secs(5))
                    .with_max_queue_size(2048)
                    .build(),
            )
            .build();
        builder.with_span_processor(batch)
    };

    #[cfg(feature = "otlp")]
    let builder = {
        use anyhow::Context;

        let settings = OtlpSettings::from_env()?;
        let mut exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_metadata(settings.metadata.clone())
            .with_timeout(std::time::Duration::from_secs(10))
            .with_endpoint(settings.endpoint.clone())
            .with_protocol(Protocol::Grpc);
        if settings.uses_tls() {
            exporter = exporter.with_tls_config(ClientTlsConfig::new().with_native_roots());
        }
        if let Some(compression) = settings.compression {
            exporter = exporter.with_compression(compression);
        }
        let exporter = exporter
            .build()
            .context("failed to build tracer exporter")?;

        let batch = sdktrace::BatchSpanProcessor::builder(exporter)
            .with_batch_config(
                sdktrace::BatchConfigBuilder::default()
                    .with_scheduled_delay(std::time::Duration::from_secs(5))
                    .with_max_queue_size(2048)
                    .build(),
            )
            .build();

        builder.with_span_processor(batch)
    };

    Ok(builder.build())
}

#[cfg(feature = "metrics")]
static CONNECTIONS_INFLIGHT: OnceLock<UpDownCounter<i64>> = OnceLock::new();
#[cfg(feature = "metrics")]
static PROMPTS: OnceLock<Counter<u64>> = OnceLock::new();
#[cfg(feature = "metrics")]
static STOP_REQUESTS: OnceLock<Counter<u64>> = OnceLock::new();
#[cfg(feature = "metrics")]
static EVENTS_DELIVERED: OnceLock<Counter<u64>> = OnceLock::new();
#[cfg(feature = "metrics")]
static DELIVERY_FAILURES: OnceLock<Counter<u64>> = OnceLock::new();
#[cfg(feature = "metrics")]
static RPC_ERRORS: OnceLock<Counter<u64>> = OnceLock::new();

#[cfg(feature = "metrics")]
fn init_metric_handles(meter: &Meter) {
    let _ = CONNECTIONS_INFLIGHT.set(
        meter
            .i64_up_down_counter("connections_inflight")
            .with_description("Open event subscriptions")
            .build(),
    );

    let _ = PROMPTS.set(
        meter
            .u64_counter("prompts")
            .with_description("Prompts accepted for generation")
            .build(),
    );

    let _ = STOP_REQUESTS.set(
        meter
            .u64_counter("stop_requests")
            .with_description("StopGeneration calls")
            .build(),
    );

    let _ = EVENTS_DELIVERED.set(
        meter
            .u64_counter("events_delivered")
            .with_description("Events pushed to connections, by event name")
            .build(),
    );

    let _ = DELIVERY_FAILURES.set(
        meter
            .u64_counter("delivery_failures")
            .with_description("Events dropped because the connection was gone")
            .build(),
    );

    let _ = RPC_ERRORS.set(
        meter
            .u64_counter("errors")
            .with_description("Rejected RPCs")
            .build(),
    );
}

// Convenience functions that compile to no-ops when metrics are disabled
#[cfg(feature = "metrics")]
pub fn increment_connections_inflight() {
    if let Some(counter) = CONNECTIONS_INFLIGHT.get() {
        counter.add(1, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn increment_connections_inflight() {}

#[cfg(feature = "metrics")]
pub fn decrement_connections_inflight() {
    if let Some(counter) = CONNECTIONS_INFLIGHT.get() {
        counter.add(-1, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn decrement_connections_inflight() {}

#[cfg(feature = "metrics")]
pub fn increment_prompts() {
    if let Some(counter) = PROMPTS.get() {
        counter.add(1, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn increment_prompts() {}

#[cfg(feature = "metrics")]
pub fn increment_stop_requests() {
    if let Some(counter) = STOP_REQUESTS.get() {
        counter.add(1, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn increment_stop_requests() {}

#[cfg(feature = "metrics")]
pub fn increment_events_delivered(event: &'static str) {
    if let Some(counter) = EVENTS_DELIVERED.get() {
        counter.add(1, &[KeyValue::new("event", event)]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn increment_events_delivered(_event: &'static str) {}

#[cfg(feature = "metrics")]
pub fn increment_delivery_failures() {
    if let Some(counter) = DELIVERY_FAILURES.get() {
        counter.add(1, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn increment_delivery_failures() {}

#[cfg(feature = "metrics")]
pub fn increment_rpc_errors() {
    if let Some(counter) = RPC_ERRORS.get() {
        counter.add(1, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn increment_rpc_errors() {}
