//! Health endpoint: reports version and storage reachability.

use axum::Json;
use axum::extract::State;
use serde::Serialize;
use tracing::warn;

use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub storage: &'static str,
    pub storage_reachable: bool,
}

/// `GET /health`: always 200; storage trouble shows up in the body.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let storage_reachable = match state.store.ping().await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "storage ping failed");
            false
        }
    };

    Json(HealthResponse {
        status: "ok",
        version: palaver_core::version(),
        storage: state.store.backend(),
        storage_reachable,
    })
}
