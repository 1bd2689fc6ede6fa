use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use oracle_core::beacon::{
    select_update_values, ConsensusSettings, SignBeaconUpdateRequest, SignBeaconUpdateResponse,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

/// Shared state of the signing server.
#[derive(Clone)]
pub struct AppState {
    pub consensus: ConsensusSettings,
    /// Current unix time in seconds. Replaced in tests.
    pub clock: Arc<dyn Fn() -> u64 + Send + Sync>,
}

impl AppState {
    #[must_use]
    pub fn new(consensus: ConsensusSettings) -> Self {
        Self { consensus, clock: Arc::new(unix_now) }
    }
}

fn unix_now() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or_default()
}

#[must_use]
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/sign-beacon-update", post(handle_sign_beacon_update))
        .with_state(state)
}

async fn handle_health() -> &'static str {
    "OK"
}

/// Validates the submitted beacons and returns the consistent values.
///
/// Malformed bodies get the same error shape as rejected beacon sets.
pub async fn handle_sign_beacon_update(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let request: SignBeaconUpdateRequest = match serde_json::from_value(payload) {
        Ok(request) => request,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "statusCode": 400,
                    "error": { "message": format!("Invalid request body: {e}") }
                })),
            );
        }
    };

    let now = (state.clock)();
    match select_update_values(&request, now, &state.consensus) {
        Ok(values) => {
            info!(
                airnode = %request.airnode,
                submitted = request.beacons.len(),
                selected = values.len(),
                "selected beacon update values"
            );
            let body = SignBeaconUpdateResponse::new(&values);
            (StatusCode::OK, Json(json!(body)))
        }
        Err(e) => {
            let status =
                StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::BAD_REQUEST);
            (status, Json(json!(e.to_response())))
        }
    }
}
