use std::time::Duration;

use axum::extract::State as StateExtractor;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tokio::time::timeout;

use crate::state::State;

const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

pub async fn handler(StateExtractor(state): StateExtractor<State>) -> Response {
    match timeout(HEALTH_CHECK_TIMEOUT, state.is_ready()).await {
        Ok(true) => {
            let msg = serde_json::json!({"status": "ok"});
            (StatusCode::OK, Json(msg)).into_response()
        }
        Ok(false) => {
            let msg = serde_json::json!({
                "status": "failure",
                "message": "store provider unavailable"
            });
            (StatusCode::SERVICE_UNAVAILABLE, Json(msg)).into_response()
        }
        Err(_) => {
            let msg = serde_json::json!({
                "status": "failure",
                "message": "health check timed out"
            });
            (StatusCode::SERVICE_UNAVAILABLE, Json(msg)).into_response()
        }
    }
}
