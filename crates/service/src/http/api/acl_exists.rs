use axum::extract::{Json, State};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use common::prelude::AccountsError;
use common::store::MemoryStoreProviderError;

use crate::state::State as ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AclExistsRequest {
    pub alias: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AclExistsResponse {
    pub exists: bool,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Json(req): Json<AclExistsRequest>,
) -> Result<impl IntoResponse, AclExistsError> {
    let exists = state.accounts().acl_exists(&req.alias).await?;
    Ok(Json(AclExistsResponse { exists }))
}

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct AclExistsError(#[from] AccountsError<MemoryStoreProviderError>);

impl IntoResponse for AclExistsError {
    fn into_response(self) -> Response {
        tracing::error!("acl lookup failed: {}", self);
        let msg = serde_json::json!({ "msg": self.to_string() });
        (http::StatusCode::INTERNAL_SERVER_ERROR, Json(msg)).into_response()
    }
}
