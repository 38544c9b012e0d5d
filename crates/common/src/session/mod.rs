//! Session token issuance and verification.
//!
//! Tokens are claims blobs MAC'd with a server-held secret:
//! `base64url(json claims) . base64url(hmac-sha256)`. They are never
//! persisted; expiry is the only lifecycle bound. Three kinds exist:
//! short-lived temporary tokens gating registration, access tokens
//! presented as bearers on protected requests, and refresh tokens
//! exchangeable for a new pair.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use time::{Duration, OffsetDateTime};

use crate::crypto::PublicKey;

type HmacSha256 = Hmac<Sha256>;

/// Lifetime of a temporary (registration) token.
pub const TEMP_TOKEN_TTL: Duration = Duration::minutes(10);
/// Lifetime of an access token.
pub const ACCESS_TOKEN_TTL: Duration = Duration::hours(1);
/// Lifetime of a refresh token.
pub const REFRESH_TOKEN_TTL: Duration = Duration::days(30);

/// Size of the generated signing secret in bytes.
const SECRET_SIZE: usize = 32;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("token signature verification failed")]
    BadSignature,
    #[error("token expired")]
    Expired,
    #[error("wrong token kind: expected {expected}, got {actual}")]
    WrongKind { expected: TokenKind, actual: TokenKind },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Temporary,
    Access,
    Refresh,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TokenKind::Temporary => "temporary",
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        };
        f.write_str(s)
    }
}

/// Subject claims carried by every token.
///
/// Temporary tokens are minted before a public key is known, so the
/// key is optional there; access and refresh tokens always carry one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub alias: String,
    pub public_key: Option<PublicKey>,
    pub kind: TokenKind,
    pub issued_at: i64,
    pub expires_at: i64,
}

/// An access/refresh pair sharing identical subject claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Mints and verifies tokens with a server-held HMAC secret.
#[derive(Debug, Clone)]
pub struct TokenSigner {
    secret: Vec<u8>,
}

impl TokenSigner {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Generate a signer with a fresh random secret. Tokens from a
    /// previous process generation will not verify.
    pub fn generate() -> Self {
        let mut secret = vec![0u8; SECRET_SIZE];
        getrandom::getrandom(&mut secret).expect("failed to generate random bytes");
        Self { secret }
    }

    /// Mint a token of the given kind with its default TTL.
    pub fn mint(&self, kind: TokenKind, alias: &str, public_key: Option<PublicKey>) -> String {
        let ttl = match kind {
            TokenKind::Temporary => TEMP_TOKEN_TTL,
            TokenKind::Access => ACCESS_TOKEN_TTL,
            TokenKind::Refresh => REFRESH_TOKEN_TTL,
        };
        self.mint_with_ttl(kind, alias, public_key, ttl)
    }

    /// Mint a token with an explicit TTL.
    pub fn mint_with_ttl(
        &self,
        kind: TokenKind,
        alias: &str,
        public_key: Option<PublicKey>,
        ttl: Duration,
    ) -> String {
        let now = OffsetDateTime::now_utc();
        let claims = Claims {
            alias: alias.to_string(),
            public_key,
            kind,
            issued_at: now.unix_timestamp(),
            expires_at: (now + ttl).unix_timestamp(),
        };
        self.encode(&claims)
    }

    /// Mint an access/refresh pair carrying identical subject claims.
    pub fn mint_pair(&self, alias: &str, public_key: Option<PublicKey>) -> TokenPair {
        TokenPair {
            access_token: self.mint(TokenKind::Access, alias, public_key),
            refresh_token: self.mint(TokenKind::Refresh, alias, public_key),
        }
    }

    /// Verify a token's MAC, expiry, and kind, returning its claims.
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<Claims, TokenError> {
        let (claims_b64, mac_b64) = token.split_once('.').ok_or(TokenError::Malformed)?;
        let mac_bytes = URL_SAFE_NO_PAD
            .decode(mac_b64)
            .map_err(|_| TokenError::Malformed)?;

        // Constant-time comparison via the hmac crate
        let mut mac = self.keyed_mac();
        mac.update(claims_b64.as_bytes());
        mac.verify_slice(&mac_bytes)
            .map_err(|_| TokenError::BadSignature)?;

        let claims_json = URL_SAFE_NO_PAD
            .decode(claims_b64)
            .map_err(|_| TokenError::Malformed)?;
        let claims: Claims =
            serde_json::from_slice(&claims_json).map_err(|_| TokenError::Malformed)?;

        if claims.expires_at < OffsetDateTime::now_utc().unix_timestamp() {
            return Err(TokenError::Expired);
        }
        if claims.kind != expected {
            return Err(TokenError::WrongKind {
                expected,
                actual: claims.kind,
            });
        }
        Ok(claims)
    }

    fn encode(&self, claims: &Claims) -> String {
        let claims_json = serde_json::to_vec(claims).expect("claims serialize");
        let claims_b64 = URL_SAFE_NO_PAD.encode(claims_json);
        let mut mac = self.keyed_mac();
        mac.update(claims_b64.as_bytes());
        let mac_b64 = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        format!("{}.{}", claims_b64, mac_b64)
    }

    fn keyed_mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(&self.secret).expect("hmac accepts any key length")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::SecretKey;

    #[test]
    fn test_round_trip() {
        let signer = TokenSigner::generate();
        let key = SecretKey::generate().public();

        let token = signer.mint(TokenKind::Access, "alice", Some(key));
        let claims = signer.verify(&token, TokenKind::Access).unwrap();
        assert_eq!(claims.alias, "alice");
        assert_eq!(claims.public_key, Some(key));
        assert_eq!(claims.kind, TokenKind::Access);
    }

    #[test]
    fn test_tampered_token_rejected() {
        let signer = TokenSigner::generate();
        let token = signer.mint(TokenKind::Access, "alice", None);

        // Flip a character in the claims portion
        let mut chars: Vec<char> = token.chars().collect();
        chars[0] = if chars[0] == 'A' { 'B' } else { 'A' };
        let tampered: String = chars.into_iter().collect();

        assert_eq!(
            signer.verify(&tampered, TokenKind::Access),
            Err(TokenError::BadSignature)
        );
    }

    #[test]
    fn test_other_signer_rejected() {
        let token = TokenSigner::generate().mint(TokenKind::Access, "alice", None);
        let other = TokenSigner::generate();
        assert_eq!(
            other.verify(&token, TokenKind::Access),
            Err(TokenError::BadSignature)
        );
    }

    #[test]
    fn test_expired_token() {
        let signer = TokenSigner::generate();
        let token =
            signer.mint_with_ttl(TokenKind::Access, "alice", None, Duration::seconds(-10));
        assert_eq!(
            signer.verify(&token, TokenKind::Access),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn test_kind_confusion_rejected() {
        let signer = TokenSigner::generate();
        let refresh = signer.mint(TokenKind::Refresh, "alice", None);
        assert!(matches!(
            signer.verify(&refresh, TokenKind::Access),
            Err(TokenError::WrongKind { .. })
        ));

        let access = signer.mint(TokenKind::Access, "alice", None);
        assert!(matches!(
            signer.verify(&access, TokenKind::Refresh),
            Err(TokenError::WrongKind { .. })
        ));
    }

    #[test]
    fn test_malformed() {
        let signer = TokenSigner::generate();
        assert_eq!(
            signer.verify("not-a-token", TokenKind::Access),
            Err(TokenError::Malformed)
        );
        assert_eq!(
            signer.verify("", TokenKind::Access),
            Err(TokenError::Malformed)
        );
    }
}
