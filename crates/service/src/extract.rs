//! Bearer-token extractors for protected routes.
//!
//! `Identity` parses and verifies an access token; `TempIdentity` does
//! the same for the temporary tokens that gate registration. Both
//! reject at the boundary with the auth taxonomy (401 for
//! missing/invalid/expired bearers) before a handler runs.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, RequestPartsExt};
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::Authorization;
use axum_extra::TypedHeader;

use common::prelude::{Claims, PublicKey, TokenKind};

use crate::state::State;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,
    #[error("invalid bearer token: {0}")]
    InvalidToken(#[from] common::session::TokenError),
    #[error("token carries no public key")]
    MissingKey,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let msg = serde_json::json!({ "msg": self.to_string() });
        (StatusCode::UNAUTHORIZED, Json(msg)).into_response()
    }
}

/// Verified access-token identity: the subject's claims plus its
/// (mandatory) public key.
#[derive(Debug, Clone)]
pub struct Identity {
    pub claims: Claims,
    pub public_key: PublicKey,
}

#[async_trait]
impl FromRequestParts<State> for Identity {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &State) -> Result<Self, Self::Rejection> {
        let claims = verify_bearer(parts, state, TokenKind::Access).await?;
        let public_key = claims.public_key.ok_or(AuthError::MissingKey)?;
        Ok(Identity { claims, public_key })
    }
}

/// Verified temporary-token identity (registration gate).
#[derive(Debug, Clone)]
pub struct TempIdentity {
    pub claims: Claims,
}

#[async_trait]
impl FromRequestParts<State> for TempIdentity {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &State) -> Result<Self, Self::Rejection> {
        let claims = verify_bearer(parts, state, TokenKind::Temporary).await?;
        Ok(TempIdentity { claims })
    }
}

async fn verify_bearer(
    parts: &mut Parts,
    state: &State,
    expected: TokenKind,
) -> Result<Claims, AuthError> {
    let TypedHeader(Authorization(bearer)) = parts
        .extract::<TypedHeader<Authorization<Bearer>>>()
        .await
        .map_err(|_| AuthError::MissingToken)?;
    Ok(state.signer().verify(bearer.token(), expected)?)
}
