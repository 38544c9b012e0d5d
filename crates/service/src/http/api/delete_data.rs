use axum::extract::{Json, State};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use common::prelude::{GatewayError, PathError, StorePath};
use common::store::MemoryStoreProviderError;

use crate::extract::Identity;
use crate::state::State as ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteDataRequest {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteDataResponse {
    pub deleted: Vec<String>,
}

pub async fn handler(
    State(state): State<ServiceState>,
    _identity: Identity,
    Json(req): Json<DeleteDataRequest>,
) -> Result<impl IntoResponse, DeleteDataError> {
    let path = StorePath::parse(&req.path)?;
    let deleted = state.gateway().delete_mutable(&path).await?;
    Ok(Json(DeleteDataResponse { deleted }))
}

#[derive(Debug, thiserror::Error)]
pub enum DeleteDataError {
    #[error("invalid path: {0}")]
    InvalidPath(#[from] PathError),
    #[error(transparent)]
    Gateway(#[from] GatewayError<MemoryStoreProviderError>),
}

impl IntoResponse for DeleteDataError {
    fn into_response(self) -> Response {
        let status = match &self {
            DeleteDataError::InvalidPath(_) => http::StatusCode::BAD_REQUEST,
            // The immutability guard fires on path shape alone
            DeleteDataError::Gateway(GatewayError::ImmutablePath(_)) => {
                http::StatusCode::FORBIDDEN
            }
            DeleteDataError::Gateway(_) => http::StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!("delete failed: {}", self);
        }
        let msg = serde_json::json!({ "msg": self.to_string() });
        (status, Json(msg)).into_response()
    }
}
