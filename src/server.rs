use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use statsd_exporter::metrics::MetricSnapshot;

use crate::AppState;

/// Builds the debug router: the same snapshots the exporter sends, as JSON.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/metrics", get(get_metrics))
        .route("/api/metrics/:name", get(get_metric))
        .with_state(state)
}

// ─── GET /api/metrics ────────────────────────────────────────────

async fn get_metrics(
    State(state): State<Arc<AppState>>,
) -> Json<BTreeMap<String, MetricSnapshot>> {
    Json(state.registry.snapshot())
}

// ─── GET /api/metrics/:name ──────────────────────────────────────

async fn get_metric(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<MetricSnapshot>, NotFound> {
    state
        .registry
        .get(&name)
        .map(|m| Json(m.snapshot()))
        .ok_or(NotFound(name))
}

struct NotFound(String);

impl IntoResponse for NotFound {
    fn into_response(self) -> Response {
        let status = StatusCode::NOT_FOUND;
        let body = serde_json::json!({
            "error":  format!("no metric named {}", self.0),
            "status": status.as_u16(),
        });
        (status, Json(body)).into_response()
    }
}
