use crate::config::Config;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use tracing_stackdriver::CloudTraceConfiguration;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "info,roster_services=debug";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber.
///
/// Deployed environments with a `GOOGLE_CLOUD_PROJECT` log Stackdriver JSON
/// linked to Cloud Trace; everything else gets human-readable output.
pub fn init_tracing(config: &Config) -> anyhow::Result<()> {
    match config.google_cloud_project() {
        Some(project_id) if !config.is_local() => {
            // W3C trace-context, so spans join the caller's trace
            opentelemetry::global::set_text_map_propagator(TraceContextPropagator::new());

            let stackdriver_layer =
                tracing_stackdriver::layer().with_cloud_trace(CloudTraceConfiguration {
                    project_id: project_id.to_owned(),
                });

            tracing_subscriber::registry()
                .with(env_filter())
                .with(tracing_opentelemetry::layer())
                .with(stackdriver_layer)
                .try_init()?;
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter())
                .with(tracing_subscriber::fmt::layer())
                .try_init()?;
        }
    }

    Ok(())
}
