//! Subscriber installation.

use crate::config::TelemetryConfig;
use crate::types::{AskError, Result};
use tracing_subscriber::EnvFilter;

/// Keeps the exporter alive; flushes pending spans on drop.
pub struct TelemetryGuard {
    #[cfg(feature = "otel")]
    tracer_provider: Option<opentelemetry_sdk::trace::SdkTracerProvider>,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        #[cfg(feature = "otel")]
        if let Some(provider) = self.tracer_provider.take() {
            if let Err(e) = provider.shutdown() {
                eprintln!("error shutting down tracer provider: {}", e);
            }
        }
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber.
///
/// Log level comes from `RUST_LOG` (default `info`). With the `otel` feature
/// and an OTLP endpoint configured, spans are also exported.
///
/// # Errors
///
/// Returns `AskError::ConfigError` if a subscriber is already installed or
/// the exporter cannot be built
pub fn init_tracing(service_name: &str, config: &TelemetryConfig) -> Result<TelemetryGuard> {
    #[cfg(feature = "otel")]
    if let Some(endpoint) = config.otlp_endpoint.as_deref() {
        return init_otlp(service_name, endpoint);
    }

    let installed = if config.json {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter())
            .json()
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter())
            .try_init()
    };
    installed.map_err(|e| AskError::ConfigError(format!("tracing initialization failed: {}", e)))?;

    tracing::debug!(service = service_name, "logging initialized");

    Ok(TelemetryGuard {
        #[cfg(feature = "otel")]
        tracer_provider: None,
    })
}

#[cfg(feature = "otel")]
fn init_otlp(service_name: &str, endpoint: &str) -> Result<TelemetryGuard> {
    use opentelemetry::{trace::TracerProvider as _, KeyValue};
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::Resource;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| AskError::ConfigError(format!("OTLP exporter build failed: {}", e)))?;

    let resource = Resource::builder_empty()
        .with_attribute(KeyValue::new("service.name", service_name.to_string()))
        .build();

    let provider = opentelemetry_sdk::trace::SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(resource)
        .build();

    let telemetry =
        tracing_opentelemetry::layer().with_tracer(provider.tracer(service_name.to_string()));

    tracing_subscriber::registry()
        .with(telemetry)
        .with(tracing_subscriber::fmt::layer())
        .with(env_filter())
        .try_init()
        .map_err(|e| AskError::ConfigError(format!("tracing initialization failed: {}", e)))?;

    tracing::info!(service = service_name, endpoint, "opentelemetry tracing initialized");

    Ok(TelemetryGuard {
        tracer_provider: Some(provider),
    })
}
