//! Process-wide tracing for the simulator.
//!
//! [`init_tracing`] installs one subscriber made of an `EnvFilter`, a console
//! formatter and, when a collector is configured, an OpenTelemetry layer that
//! exports the per-session spans opened by the simulator.
//!
//! | Variable | Effect |
//! |---|---|
//! | `RUST_LOG` | Log filter (default `"info"`). |
//! | `REHABSIM_LOG_FORMAT=json` | Newline-delimited JSON, whatever `logging.format` says. |
//! | `OTEL_EXPORTER_OTLP_ENDPOINT` | Export spans over OTLP/HTTP to this collector. |
//!
//! ```rust,no_run
//! use rehabsim_types::LogFormat;
//!
//! let _guard = rehabsim_runtime::telemetry::init_tracing("rehabsim", LogFormat::Compact);
//! ```

use opentelemetry::KeyValue;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{Resource, trace::SdkTracerProvider};
use rehabsim_types::LogFormat;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "info";
const FORMAT_VAR: &str = "REHABSIM_LOG_FORMAT";
const ENDPOINT_VAR: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";

/// Where log output goes, after environment overrides are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TelemetrySettings {
    filter: String,
    format: LogFormat,
    otlp_endpoint: Option<String>,
}

impl TelemetrySettings {
    fn resolve(configured: LogFormat, var: impl Fn(&str) -> Option<String>) -> Self {
        let format = match var(FORMAT_VAR).as_deref() {
            Some("json") => LogFormat::Json,
            _ => configured,
        };
        Self {
            filter: var("RUST_LOG").unwrap_or_else(|| DEFAULT_FILTER.to_string()),
            format,
            otlp_endpoint: var(ENDPOINT_VAR).filter(|e| !e.is_empty()),
        }
    }
}

/// Install the global subscriber.  Hold the returned guard until exit.
///
/// An unparsable `RUST_LOG` falls back to `"info"`.
pub fn init_tracing(service_name: &str, format: LogFormat) -> TracerProviderGuard {
    let settings = TelemetrySettings::resolve(format, |name| std::env::var(name).ok());
    let filter = EnvFilter::try_new(&settings.filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let console = match settings.format {
        LogFormat::Json => tracing_subscriber::fmt::layer().json().boxed(),
        LogFormat::Compact => tracing_subscriber::fmt::layer().compact().boxed(),
    };

    let provider = settings
        .otlp_endpoint
        .as_deref()
        .and_then(|endpoint| build_provider(service_name, endpoint));
    let spans = provider
        .as_ref()
        .map(|p| tracing_opentelemetry::layer().with_tracer(p.tracer(service_name.to_string())));

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(spans)
        .init();

    TracerProviderGuard(provider)
}

/// Flushes and shuts down the span exporter on drop.
pub struct TracerProviderGuard(Option<SdkTracerProvider>);

impl Drop for TracerProviderGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.0.take()
            && let Err(e) = provider.shutdown()
        {
            eprintln!("[rehabsim] span exporter shutdown failed: {e}");
        }
    }
}

fn build_provider(service_name: &str, endpoint: &str) -> Option<SdkTracerProvider> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| eprintln!("[rehabsim] OTLP exporter for {endpoint} unavailable: {e}"))
        .ok()?;

    let resource = Resource::builder()
        .with_service_name(service_name.to_string())
        .with_attribute(KeyValue::new("service.version", env!("CARGO_PKG_VERSION")))
        .build();

    Some(
        SdkTracerProvider::builder()
            .with_resource(resource)
            // Synchronous export: no tokio runtime exists yet at startup.
            .with_simple_exporter(exporter)
            .build(),
    )
}
