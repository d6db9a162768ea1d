//! Prometheus metrics HTTP server.
//!
//! Exposes engine operation statistics in Prometheus text format. This is
//! the engine's own observability surface — a separate concern from the
//! skew snapshot publication (`crate::snapshot`), whose transport is out
//! of scope.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, http::StatusCode, response::IntoResponse, routing::get, extract::State};
use tokio::net::TcpListener;
use tracing::info;

use crate::stats::SkimmerStats;

/// Shared state for the metrics server.
#[derive(Clone)]
pub struct MetricsState {
    stats: Arc<SkimmerStats>,
}

/// Start the Prometheus metrics HTTP server.
///
/// Runs in the background and serves metrics at `/metrics`.
/// Returns an error if the server fails to bind to the port.
pub async fn start_metrics_server(port: u16, stats: Arc<SkimmerStats>) -> Result<(), std::io::Error> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let state = MetricsState { stats };

    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .with_state(state);

    let listener = TcpListener::bind(addr).await?;
    info!(
        "Prometheus metrics server listening on http://{}/metrics",
        addr
    );

    axum::serve(listener, app)
        .await
        .map_err(|e| std::io::Error::other(e.to_string()))
}

/// Health check endpoint.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Prometheus metrics endpoint.
async fn metrics_handler(State(state): State<MetricsState>) -> impl IntoResponse {
    let output = format_prometheus_metrics(&state.stats);
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        output,
    )
}

/// Format statistics as Prometheus text format.
fn format_prometheus_metrics(stats: &SkimmerStats) -> String {
    let summary = stats.summary();
    let mut output = String::with_capacity(2048);

    output.push_str("# HELP skew_uptime_seconds Time since the engine started\n");
    output.push_str("# TYPE skew_uptime_seconds gauge\n");
    output.push_str(&format!("skew_uptime_seconds {:.3}\n", summary.elapsed_secs));

    output.push_str("# HELP skew_admitted_total Spots admitted to the window\n");
    output.push_str("# TYPE skew_admitted_total counter\n");
    output.push_str(&format!("skew_admitted_total {}\n", summary.admitted));

    output.push_str("# HELP skew_dropped_total Spots rejected by the admission policy, by reason\n");
    output.push_str("# TYPE skew_dropped_total counter\n");
    output.push_str(&format!(
        "skew_dropped_total{{reason=\"snr\"}} {}\n",
        summary.dropped_snr
    ));
    output.push_str(&format!(
        "skew_dropped_total{{reason=\"freq\"}} {}\n",
        summary.dropped_freq
    ));
    output.push_str(&format!(
        "skew_dropped_total{{reason=\"mode\"}} {}\n",
        summary.dropped_mode
    ));
    output.push_str(&format!(
        "skew_dropped_total{{reason=\"spot_type\"}} {}\n",
        summary.dropped_spot_type
    ));

    output.push_str("# HELP skew_correlated_total Correlation events emitted\n");
    output.push_str("# TYPE skew_correlated_total counter\n");
    output.push_str(&format!("skew_correlated_total {}\n", summary.correlated));

    output.push_str("# HELP skew_reference_registry_size Current size of the reference registry\n");
    output.push_str("# TYPE skew_reference_registry_size gauge\n");
    output.push_str(&format!(
        "skew_reference_registry_size {}\n",
        summary.registry_size
    ));

    output.push_str("# HELP skew_skimmer_table_size Current size of the skimmer table\n");
    output.push_str("# TYPE skew_skimmer_table_size gauge\n");
    output.push_str(&format!("skew_skimmer_table_size {}\n", summary.table_size));

    if let Some(ref dev) = summary.deviation_percentiles {
        output.push_str("# HELP skew_deviation_ppm Correlated deviation distribution, in ppm\n");
        output.push_str("# TYPE skew_deviation_ppm summary\n");
        output.push_str(&format!("skew_deviation_ppm{{quantile=\"0.5\"}} {}\n", dev.p50));
        output.push_str(&format!("skew_deviation_ppm{{quantile=\"0.9\"}} {}\n", dev.p90));
        output.push_str(&format!("skew_deviation_ppm{{quantile=\"0.99\"}} {}\n", dev.p99));
        output.push_str(&format!("skew_deviation_ppm_count {}\n", summary.correlated));
    }

    output
}
