use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::crypto::{KeyError, PublicKey};

/// An entry in an access record's allowed set: a specific public key,
/// or the wildcard admitting any key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPattern {
    Wildcard,
    Key(PublicKey),
}

impl KeyPattern {
    /// Whether this pattern admits the given key.
    pub fn admits(&self, key: &PublicKey) -> bool {
        match self {
            KeyPattern::Wildcard => true,
            KeyPattern::Key(k) => k == key,
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, KeyPattern::Wildcard)
    }
}

impl fmt::Display for KeyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPattern::Wildcard => f.write_str("*"),
            KeyPattern::Key(k) => write!(f, "{}", k),
        }
    }
}

impl FromStr for KeyPattern {
    type Err = KeyError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "*" {
            Ok(KeyPattern::Wildcard)
        } else {
            Ok(KeyPattern::Key(PublicKey::from_hex(s)?))
        }
    }
}

impl From<PublicKey> for KeyPattern {
    fn from(key: PublicKey) -> Self {
        KeyPattern::Key(key)
    }
}

impl Serialize for KeyPattern {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for KeyPattern {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Per-path access control record.
///
/// The document id is the record's path; the body carries the owner
/// (fixed at creation, implicitly trusted to sign future mutations for
/// that path) and the allowed set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessRecord {
    pub owner: PublicKey,
    pub allowed: Vec<KeyPattern>,
}

impl AccessRecord {
    /// Fresh record owned by `owner`, with nobody else allowed.
    pub fn new(owner: PublicKey) -> Self {
        Self {
            owner,
            allowed: Vec::new(),
        }
    }

    /// Self-owned record created at registration: the subject both
    /// owns the record and appears in its own allowed set.
    pub fn self_owned(owner: PublicKey) -> Self {
        Self {
            owner,
            allowed: vec![KeyPattern::Key(owner)],
        }
    }

    /// Whether `key` may write under this record: the owner always
    /// may; otherwise any allowed entry must admit it.
    pub fn admits(&self, key: &PublicKey) -> bool {
        self.owner == *key || self.allowed.iter().any(|p| p.admits(key))
    }
}
