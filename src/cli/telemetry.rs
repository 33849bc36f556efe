//! Log output and the optional OTLP trace exporter.
//!
//! Export is switched on by `OTEL_EXPORTER_OTLP_ENDPOINT`; only gRPC is spoken.

use anyhow::{Context, Result};
use opentelemetry::{global, trace::TracerProvider as _, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    propagation::TraceContextPropagator,
    runtime,
    trace::{Tracer, TracerProvider},
    Resource,
};
use std::{env, sync::OnceLock, time::Duration};
use tracing::{debug, error, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};
use ulid::Ulid;

const ENDPOINT_VAR: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";
const EXPORT_TIMEOUT: Duration = Duration::from_secs(3);

/// Noisy dependencies capped regardless of `-v`.
const QUIET_TARGETS: [&str; 4] = [
    "hyper=error",
    "tokio=error",
    "reqwest=warn",
    "opentelemetry_sdk=warn",
];

static PROVIDER: OnceLock<TracerProvider> = OnceLock::new();

/// Collector endpoints without a scheme are assumed to speak TLS.
fn collector_url(endpoint: &str) -> String {
    let endpoint = endpoint.trim().trim_end_matches('/');
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        endpoint.to_string()
    } else {
        format!("https://{endpoint}")
    }
}

fn otlp_tracer(endpoint: &str) -> Result<Tracer> {
    if let Ok(protocol) = env::var("OTEL_EXPORTER_OTLP_PROTOCOL") {
        if protocol != "grpc" {
            debug!("OTEL_EXPORTER_OTLP_PROTOCOL={} ignored, exporting over grpc", protocol);
        }
    }

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(collector_url(endpoint))
        .with_timeout(EXPORT_TIMEOUT)
        .build()
        .context("Failed to build OTLP span exporter")?;

    let instance_id =
        env::var("OTEL_SERVICE_INSTANCE_ID").unwrap_or_else(|_| Ulid::new().to_string());

    let provider = TracerProvider::builder()
        .with_batch_exporter(exporter, runtime::Tokio)
        .with_resource(Resource::new(vec![
            KeyValue::new("service.name", env!("CARGO_PKG_NAME")),
            KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
            KeyValue::new("service.instance.id", instance_id),
        ]))
        .build();

    global::set_tracer_provider(provider.clone());
    global::set_text_map_propagator(TraceContextPropagator::new());

    let tracer = provider.tracer(env!("CARGO_PKG_NAME"));
    let _ = PROVIDER.set(provider);

    Ok(tracer)
}

fn filter(level: Level) -> Result<EnvFilter> {
    QUIET_TARGETS.iter().try_fold(
        EnvFilter::builder()
            .with_default_directive(level.into())
            .from_env_lossy(),
        |filter, directive| Ok(filter.add_directive(directive.parse()?)),
    )
}

/// Install the global subscriber. `None` means ERROR; `RUST_LOG` refines it.
///
/// # Errors
/// Returns an error if the exporter cannot be built or a subscriber is
/// already installed.
pub fn init(level: Option<Level>) -> Result<()> {
    let fmt_layer = fmt::layer()
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_target(false)
        .pretty();

    let otel_layer = match env::var(ENDPOINT_VAR) {
        Ok(endpoint) => Some(tracing_opentelemetry::layer().with_tracer(otlp_tracer(&endpoint)?)),
        Err(_) => None,
    };

    let subscriber = Registry::default()
        .with(filter(level.unwrap_or(Level::ERROR))?)
        .with(fmt_layer)
        .with(otel_layer);

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

/// Flush and stop the exporter; does nothing when export was never enabled.
pub fn shutdown_tracer() {
    if let Some(provider) = PROVIDER.get() {
        debug!("flushing spans");
        if let Err(err) = provider.shutdown() {
            error!("Failed to shut down tracer provider: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collector_url_keeps_scheme() {
        assert_eq!(collector_url("http://localhost:4317"), "http://localhost:4317");
    }

    #[test]
    fn collector_url_defaults_to_https() {
        assert_eq!(collector_url("localhost:4317"), "https://localhost:4317");
    }

    #[test]
    fn collector_url_trims_trailing_slash() {
        assert_eq!(
            collector_url("otel.example.com:4317/"),
            "https://otel.example.com:4317"
        );
        assert_eq!(collector_url("http://collector/"), "http://collector");
    }

    #[test]
    fn filter_accepts_quiet_targets() {
        assert!(filter(Level::INFO).is_ok());
    }

    #[test]
    fn shutdown_without_provider_is_noop() {
        shutdown_tracer();
    }
}
