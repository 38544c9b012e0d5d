use axum::extract::{Json, State};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use common::prelude::AccountsError;
use common::store::MemoryStoreProviderError;

use crate::state::State as ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticateRequest {
    pub alias: String,
    pub pass: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticateResponse {
    pub access_token: String,
    pub refresh_token: String,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Json(req): Json<AuthenticateRequest>,
) -> Result<impl IntoResponse, AuthenticateError> {
    let credential = state.accounts().authenticate(&req.alias, &req.pass).await?;

    let pair = state
        .signer()
        .mint_pair(&credential.alias, Some(credential.public_key));
    tracing::debug!(alias = %credential.alias, "authenticated");

    Ok(Json(AuthenticateResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
    }))
}

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct AuthenticateError(#[from] AccountsError<MemoryStoreProviderError>);

impl IntoResponse for AuthenticateError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            AccountsError::NotFound(_) => http::StatusCode::NOT_FOUND,
            AccountsError::BadPassword => http::StatusCode::UNAUTHORIZED,
            _ => http::StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!("authenticate failed: {}", self);
        }
        let msg = serde_json::json!({ "msg": self.to_string() });
        (status, Json(msg)).into_response()
    }
}
