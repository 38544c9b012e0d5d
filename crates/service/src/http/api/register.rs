use axum::extract::{Json, State};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use common::prelude::{AccountsError, PublicKey};
use common::store::MemoryStoreProviderError;

use crate::extract::TempIdentity;
use crate::state::State as ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub alias: String,
    pub public_key: PublicKey,
    /// Hex SHA-256 of the password, hashed client-side
    pub password_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub message: String,
    pub token: String,
    pub refresh_token: String,
}

pub async fn handler(
    State(state): State<ServiceState>,
    identity: TempIdentity,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, RegisterError> {
    // The temporary token was bound to an alias at issuance; the
    // registration must be for the same one
    if identity.claims.alias != req.alias {
        return Err(RegisterError::AliasMismatch);
    }

    state
        .accounts()
        .register(&req.alias, req.public_key, &req.password_hash)
        .await?;

    let pair = state.signer().mint_pair(&req.alias, Some(req.public_key));
    Ok((
        http::StatusCode::CREATED,
        Json(RegisterResponse {
            message: format!("registered {}", req.alias),
            token: pair.access_token,
            refresh_token: pair.refresh_token,
        }),
    )
        .into_response())
}

#[derive(Debug, thiserror::Error)]
pub enum RegisterError {
    #[error("temporary token was issued for a different alias")]
    AliasMismatch,
    #[error(transparent)]
    Accounts(#[from] AccountsError<MemoryStoreProviderError>),
}

impl IntoResponse for RegisterError {
    fn into_response(self) -> Response {
        let status = match &self {
            RegisterError::AliasMismatch => http::StatusCode::FORBIDDEN,
            RegisterError::Accounts(AccountsError::AliasTaken(_)) => http::StatusCode::CONFLICT,
            RegisterError::Accounts(_) => http::StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!("register failed: {}", self);
        }
        let msg = serde_json::json!({ "msg": self.to_string() });
        (status, Json(msg)).into_response()
    }
}
