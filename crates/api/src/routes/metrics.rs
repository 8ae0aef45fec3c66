//! Prometheus metrics endpoint and metric descriptions.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;

/// Registers help text for the counters the command handler emits.
///
/// Call once after installing the recorder.
pub fn describe() {
    metrics::describe_counter!(
        "commands_handled_total",
        "Commands whose event was appended to the log"
    );
    metrics::describe_counter!(
        "commands_rejected_total",
        "Commands refused by a business rule, labelled by reason"
    );
    metrics::describe_counter!(
        "concurrency_conflicts_total",
        "Appends refused because the stream moved after it was read"
    );
}

/// GET /metrics: returns Prometheus-formatted metrics.
pub async fn get(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        handle.render(),
    )
}
