use axum::extract::{Json, State};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use common::prelude::TokenKind;

use crate::state::State as ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestTokenRequest {
    /// Alias the temporary token will be bound to
    pub alias: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestTokenResponse {
    pub token: String,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Json(req): Json<RequestTokenRequest>,
) -> Result<impl IntoResponse, RequestTokenError> {
    if req.alias.is_empty() {
        return Err(RequestTokenError::InvalidAlias);
    }

    let token = state.signer().mint(TokenKind::Temporary, &req.alias, None);
    tracing::debug!(alias = %req.alias, "issued temporary token");

    Ok(Json(RequestTokenResponse { token }))
}

#[derive(Debug, thiserror::Error)]
pub enum RequestTokenError {
    #[error("alias cannot be empty")]
    InvalidAlias,
}

impl IntoResponse for RequestTokenError {
    fn into_response(self) -> Response {
        let msg = serde_json::json!({ "msg": self.to_string() });
        (http::StatusCode::BAD_REQUEST, Json(msg)).into_response()
    }
}
