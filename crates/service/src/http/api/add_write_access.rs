use axum::extract::{Json, State};
use axum::response::{IntoResponse, Response};
use ed25519_dalek::Signature;
use serde::{Deserialize, Serialize};

use common::prelude::{AclError, GrantOutcome, KeyPattern, PathError, StorePath};
use common::store::MemoryStoreProviderError;

use crate::extract::Identity;
use crate::state::State as ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddWriteAccessRequest {
    pub path: String,
    /// Grantee public key (hex) or the wildcard "*"
    pub public_key: String,
    /// Hex-encoded detached Ed25519 signature over
    /// `{path}-{public_key}-grant` by the record owner
    pub signature: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddWriteAccessResponse {
    pub message: String,
    pub path: String,
    pub allowed: Option<Vec<KeyPattern>>,
}

pub async fn handler(
    State(state): State<ServiceState>,
    identity: Identity,
    Json(req): Json<AddWriteAccessRequest>,
) -> Result<impl IntoResponse, AddWriteAccessError> {
    let path = StorePath::parse(&req.path)?;
    let grantee: KeyPattern = req
        .public_key
        .parse()
        .map_err(|_| AddWriteAccessError::InvalidGrantee(req.public_key.clone()))?;
    let signature = parse_signature(&req.signature)?;

    let outcome = state
        .acl()
        .grant(&path, &grantee, &signature, &identity.public_key)
        .await?;

    let response = match outcome {
        GrantOutcome::Granted { path, allowed } => AddWriteAccessResponse {
            message: format!("granted {} on {}", grantee, path),
            path,
            allowed: Some(allowed),
        },
        GrantOutcome::AlreadyGranted { path } => AddWriteAccessResponse {
            message: format!("{} already granted on {}", grantee, path),
            path,
            allowed: None,
        },
    };
    Ok(Json(response))
}

pub(super) fn parse_signature(hex_sig: &str) -> Result<Signature, InvalidSignatureEncoding> {
    let bytes = hex::decode(hex_sig).map_err(|_| InvalidSignatureEncoding)?;
    let bytes: [u8; 64] = bytes.try_into().map_err(|_| InvalidSignatureEncoding)?;
    Ok(Signature::from_bytes(&bytes))
}

#[derive(Debug, thiserror::Error)]
#[error("signature is not 64 hex-encoded bytes")]
pub struct InvalidSignatureEncoding;

#[derive(Debug, thiserror::Error)]
pub enum AddWriteAccessError {
    #[error("invalid path: {0}")]
    InvalidPath(#[from] PathError),
    #[error("invalid grantee key: {0}")]
    InvalidGrantee(String),
    #[error(transparent)]
    InvalidSignature(#[from] InvalidSignatureEncoding),
    #[error(transparent)]
    Acl(#[from] AclError<MemoryStoreProviderError>),
}

impl IntoResponse for AddWriteAccessError {
    fn into_response(self) -> Response {
        let status = match &self {
            AddWriteAccessError::InvalidPath(_)
            | AddWriteAccessError::InvalidGrantee(_)
            | AddWriteAccessError::InvalidSignature(_) => http::StatusCode::BAD_REQUEST,
            AddWriteAccessError::Acl(AclError::SignatureInvalid(_)) => http::StatusCode::FORBIDDEN,
            AddWriteAccessError::Acl(_) => http::StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!("add-write-access failed: {}", self);
        }
        let msg = serde_json::json!({ "msg": self.to_string() });
        (status, Json(msg)).into_response()
    }
}
