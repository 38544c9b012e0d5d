use axum::extract::{Json, State};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use common::prelude::{TokenError, TokenKind};

use crate::state::State as ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenResponse {
    pub access_token: String,
    pub refresh_token: String,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Json(req): Json<RefreshTokenRequest>,
) -> Result<impl IntoResponse, RefreshTokenError> {
    // Any verification failure is a 403; there is no server-side
    // revocation, expiry is the only lifecycle bound
    let claims = state
        .signer()
        .verify(&req.refresh_token, TokenKind::Refresh)?;

    let pair = state.signer().mint_pair(&claims.alias, claims.public_key);
    tracing::debug!(alias = %claims.alias, "refreshed token pair");

    Ok(Json(RefreshTokenResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
    }))
}

#[derive(Debug, thiserror::Error)]
#[error("invalid refresh token: {0}")]
pub struct RefreshTokenError(#[from] TokenError);

impl IntoResponse for RefreshTokenError {
    fn into_response(self) -> Response {
        let msg = serde_json::json!({ "msg": self.to_string() });
        (http::StatusCode::FORBIDDEN, Json(msg)).into_response()
    }
}
