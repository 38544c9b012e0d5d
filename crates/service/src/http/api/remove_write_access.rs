use axum::extract::{Json, State};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use common::prelude::{AclError, KeyPattern, PathError, StorePath};
use common::store::MemoryStoreProviderError;

use super::add_write_access::{parse_signature, InvalidSignatureEncoding};
use crate::extract::Identity;
use crate::state::State as ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveWriteAccessRequest {
    pub path: String,
    /// Grantee public key (hex) or the wildcard "*"
    pub public_key: String,
    /// Hex-encoded detached Ed25519 signature over
    /// `{path}-{public_key}-revoke` by the record owner
    pub signature: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveWriteAccessResponse {
    pub message: String,
    pub path: String,
    pub allowed: Vec<KeyPattern>,
}

pub async fn handler(
    State(state): State<ServiceState>,
    _identity: Identity,
    Json(req): Json<RemoveWriteAccessRequest>,
) -> Result<impl IntoResponse, RemoveWriteAccessError> {
    let path = StorePath::parse(&req.path)?;
    let grantee: KeyPattern = req
        .public_key
        .parse()
        .map_err(|_| RemoveWriteAccessError::InvalidGrantee(req.public_key.clone()))?;
    let signature = parse_signature(&req.signature)?;

    let outcome = state.acl().revoke(&path, &grantee, &signature).await?;

    Ok(Json(RemoveWriteAccessResponse {
        message: format!("revoked {} on {}", grantee, outcome.path),
        path: outcome.path,
        allowed: outcome.allowed,
    }))
}

#[derive(Debug, thiserror::Error)]
pub enum RemoveWriteAccessError {
    #[error("invalid path: {0}")]
    InvalidPath(#[from] PathError),
    #[error("invalid grantee key: {0}")]
    InvalidGrantee(String),
    #[error(transparent)]
    InvalidSignature(#[from] InvalidSignatureEncoding),
    #[error(transparent)]
    Acl(#[from] AclError<MemoryStoreProviderError>),
}

impl IntoResponse for RemoveWriteAccessError {
    fn into_response(self) -> Response {
        let status = match &self {
            RemoveWriteAccessError::InvalidPath(_)
            | RemoveWriteAccessError::InvalidGrantee(_)
            | RemoveWriteAccessError::InvalidSignature(_) => http::StatusCode::BAD_REQUEST,
            RemoveWriteAccessError::Acl(AclError::SignatureInvalid(_)) => {
                http::StatusCode::FORBIDDEN
            }
            RemoveWriteAccessError::Acl(AclError::NotFound(_))
            | RemoveWriteAccessError::Acl(AclError::GranteeNotFound { .. }) => {
                http::StatusCode::NOT_FOUND
            }
            RemoveWriteAccessError::Acl(_) => http::StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!("remove-write-access failed: {}", self);
        }
        let msg = serde_json::json!({ "msg": self.to_string() });
        (status, Json(msg)).into_response()
    }
}
