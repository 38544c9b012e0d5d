use axum::extract::{Json, State};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use common::prelude::{DataRecord, GatewayError, PathError, StorePath};
use common::store::MemoryStoreProviderError;

use crate::state::State as ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchDataRequest {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchDataResponse {
    pub records: Vec<DataRecord>,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Json(req): Json<FetchDataRequest>,
) -> Result<impl IntoResponse, FetchDataError> {
    let path = StorePath::parse(&req.path)?;
    let records = state.gateway().fetch(&path).await?;
    Ok(Json(FetchDataResponse { records }))
}

#[derive(Debug, thiserror::Error)]
pub enum FetchDataError {
    #[error("invalid path: {0}")]
    InvalidPath(#[from] PathError),
    #[error(transparent)]
    Gateway(#[from] GatewayError<MemoryStoreProviderError>),
}

impl IntoResponse for FetchDataError {
    fn into_response(self) -> Response {
        let status = match &self {
            FetchDataError::InvalidPath(_) => http::StatusCode::BAD_REQUEST,
            FetchDataError::Gateway(_) => http::StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!("fetch-data failed: {}", self);
        }
        let msg = serde_json::json!({ "msg": self.to_string() });
        (status, Json(msg)).into_response()
    }
}
