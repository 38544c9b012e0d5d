use axum::extract::{Json, State};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use common::prelude::{AclError, GatewayError, PathError, StorePath, WriteOutcome};
use common::store::MemoryStoreProviderError;

use crate::extract::Identity;
use crate::state::State as ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateDataRequest {
    pub path: String,
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateDataResponse {
    pub message: String,
    #[serde(flatten)]
    pub outcome: WriteOutcome,
}

pub async fn handler(
    State(state): State<ServiceState>,
    identity: Identity,
    Json(req): Json<UpdateDataRequest>,
) -> Result<impl IntoResponse, UpdateDataError> {
    let path = StorePath::parse(&req.path)?;

    // Permission resolves against the verified key from the bearer
    // token, never anything asserted in the body
    let allowed = state
        .acl()
        .resolve_write(&path, &identity.public_key)
        .await?;
    if !allowed {
        return Err(UpdateDataError::AccessDenied(path.to_string()));
    }

    let outcome = state.gateway().write(&path, req.value).await?;
    Ok((
        http::StatusCode::CREATED,
        Json(UpdateDataResponse {
            message: format!("wrote {}", outcome.id),
            outcome,
        }),
    )
        .into_response())
}

#[derive(Debug, thiserror::Error)]
pub enum UpdateDataError {
    #[error("invalid path: {0}")]
    InvalidPath(#[from] PathError),
    #[error("write access denied on {0}")]
    AccessDenied(String),
    #[error(transparent)]
    Acl(#[from] AclError<MemoryStoreProviderError>),
    #[error(transparent)]
    Gateway(#[from] GatewayError<MemoryStoreProviderError>),
}

impl IntoResponse for UpdateDataError {
    fn into_response(self) -> Response {
        let status = match &self {
            UpdateDataError::InvalidPath(_) => http::StatusCode::BAD_REQUEST,
            UpdateDataError::AccessDenied(_) => http::StatusCode::FORBIDDEN,
            UpdateDataError::Gateway(GatewayError::DigestMismatch { .. })
            | UpdateDataError::Gateway(GatewayError::MissingBase(_)) => {
                http::StatusCode::BAD_REQUEST
            }
            UpdateDataError::Gateway(GatewayError::AlreadyExists(_)) => http::StatusCode::CONFLICT,
            UpdateDataError::Gateway(GatewayError::ImmutablePath(_)) => {
                http::StatusCode::FORBIDDEN
            }
            UpdateDataError::Acl(_) | UpdateDataError::Gateway(_) => {
                http::StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        if status.is_server_error() {
            tracing::error!("update-data failed: {}", self);
        }
        let msg = serde_json::json!({ "msg": self.to_string() });
        (status, Json(msg)).into_response()
    }
}
