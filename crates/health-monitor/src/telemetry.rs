//! Tracing subscriber setup with optional OpenTelemetry export.

use crate::config::{LoggingSettings, TelemetrySettings};
use common::logging::{LogFormat, env_filter};
use opentelemetry::{KeyValue, trace::TracerProvider as _};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    Resource, runtime,
    trace::{RandomIdGenerator, Sampler, TracerProvider},
};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// OpenTelemetry tracer guard
///
/// When dropped, flushes all pending spans and shuts down the tracer
pub struct TelemetryGuard;

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        opentelemetry::global::shutdown_tracer_provider();
    }
}

/// Build a tracer provider exporting spans over OTLP/gRPC
///
/// The provider is also installed as the global provider so the guard can
/// shut it down.
pub fn init_tracer_provider(
    service_name: &str,
    otlp_endpoint: &str,
) -> Result<TracerProvider, BoxError> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(otlp_endpoint)
        .build()?;

    let resource = Resource::new(vec![
        KeyValue::new("service.name", service_name.to_string()),
        KeyValue::new("service.version", env!("CARGO_PKG_VERSION").to_string()),
    ]);

    let provider = TracerProvider::builder()
        .with_batch_exporter(exporter, runtime::Tokio)
        .with_config(
            opentelemetry_sdk::trace::Config::default()
                .with_sampler(Sampler::AlwaysOn)
                .with_id_generator(RandomIdGenerator::default())
                .with_resource(resource),
        )
        .build();

    opentelemetry::global::set_tracer_provider(provider.clone());
    Ok(provider)
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` overrides the configured level. Returns a guard when spans are
/// exported; keep it alive for the lifetime of the process.
pub async fn setup_tracing(
    logging: &LoggingSettings,
    telemetry: &TelemetrySettings,
) -> Result<Option<TelemetryGuard>, BoxError> {
    let level = logging.level.as_deref().unwrap_or("info");
    let format = LogFormat::parse(logging.format.as_deref());

    let provider = if telemetry.enabled {
        Some(init_tracer_provider(
            &telemetry.service_name,
            &telemetry.otlp_endpoint,
        )?)
    } else {
        None
    };

    let otel_layer = provider.as_ref().map(|p| {
        tracing_opentelemetry::layer().with_tracer(p.tracer(telemetry.service_name.clone()))
    });

    tracing_subscriber::registry()
        .with(env_filter(level))
        .with(format.is_json().then(|| fmt::layer().json()))
        .with((!format.is_json()).then(fmt::layer))
        .with(otel_layer)
        .try_init()?;

    if telemetry.enabled {
        tracing::info!(
            service_name = %telemetry.service_name,
            otlp_endpoint = %telemetry.otlp_endpoint,
            "Tracing initialized with OpenTelemetry integration"
        );
        Ok(Some(TelemetryGuard))
    } else {
        tracing::info!("Tracing initialized without OpenTelemetry");
        Ok(None)
    }
}
