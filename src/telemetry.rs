//! Logging and metrics setup
//!
//! Logging goes through a `tracing-subscriber` fmt layer. Metrics are recorded
//! through the `metrics` facade and optionally exported for Prometheus scraping.

use crate::config::MetricsSettings;
use crate::ScreenshotError;
use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Once;
use tracing::info;
use tracing_subscriber::EnvFilter;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install the global fmt subscriber. `RUST_LOG` wins over the verbosity flag when set.
pub fn setup_logging(verbose: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
}

/// Install the Prometheus exporter when configured. Without it the `metrics`
/// macros record into the no-op recorder.
pub fn install_metrics(settings: &MetricsSettings) -> Result<(), ScreenshotError> {
    describe_metrics();

    let Some(addr) = settings.prometheus_listen else {
        return Ok(());
    };

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| ScreenshotError::ConfigurationError(format!("metrics exporter: {e}")))?;

    info!("Prometheus metrics exposed on {}", addr);
    Ok(())
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "screenshot_requests_total",
            Unit::Count,
            "Screenshot requests by outcome."
        );
        describe_histogram!(
            "screenshot_capture_seconds",
            Unit::Seconds,
            "Time from context creation to encoded image."
        );
        describe_gauge!(
            "screenshot_active_contexts",
            Unit::Count,
            "Browser contexts currently open."
        );
        describe_counter!(
            "browser_unavailable_total",
            Unit::Count,
            "Requests that found the shared browser process unavailable."
        );
    });
}
