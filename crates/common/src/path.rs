//! Ordered-segment storage paths.
//!
//! Paths arrive on the wire as `/`-separated, possibly percent-encoded
//! strings. They are decoded exactly once, at construction, into an
//! ordered list of segments; every comparison in the gateway happens on
//! decoded segment lists, never on re-escaped substrings.

use std::fmt;
use std::str::FromStr;

use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};

use crate::digest;

/// Root segment of the namespace subject to ACL enforcement.
///
/// Paths outside this namespace are not access controlled.
pub const USER_NAMESPACE: &str = "users";

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("path is empty")]
    Empty,
    #[error("path segment is not valid percent-encoded utf-8: {0}")]
    BadEncoding(String),
}

/// A decoded storage path: a non-empty ordered list of segments.
///
/// `Display` re-joins the decoded segments with `/`, which is also the
/// canonical form used as a document id in the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorePath {
    segments: Vec<String>,
}

impl StorePath {
    /// Parse a path from its wire form, percent-decoding each segment.
    ///
    /// Leading, trailing, and doubled separators are tolerated and
    /// collapsed; a path with no segments at all is an error.
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        let mut segments = Vec::new();
        for part in raw.split('/') {
            if part.is_empty() {
                continue;
            }
            let decoded = percent_decode_str(part)
                .decode_utf8()
                .map_err(|_| PathError::BadEncoding(part.to_string()))?;
            segments.push(decoded.into_owned());
        }
        if segments.is_empty() {
            return Err(PathError::Empty);
        }
        Ok(Self { segments })
    }

    /// The decoded segments, in order.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Truncate the last segment, yielding the parent path.
    ///
    /// Returns `None` once there is nothing left to truncate - the
    /// terminating condition of the ancestor permission walk.
    pub fn parent(&self) -> Option<StorePath> {
        if self.segments.len() <= 1 {
            return None;
        }
        Some(StorePath {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Whether `self` is a prefix of `other`, compared segment-wise.
    pub fn is_prefix_of(&self, other: &StorePath) -> bool {
        other.segments.len() >= self.segments.len()
            && other.segments[..self.segments.len()] == self.segments[..]
    }

    /// Whether this path falls inside the access-controlled namespace.
    pub fn in_user_namespace(&self) -> bool {
        self.segments.first().map(String::as_str) == Some(USER_NAMESPACE)
    }

    /// Index of the first segment matching the content-digest pattern,
    /// if any. Presence of such a segment is what routes a write to the
    /// immutable path and forbids deletion under it.
    pub fn digest_segment_index(&self) -> Option<usize> {
        self.segments
            .iter()
            .position(|s| digest::is_digest_segment(s))
    }

    /// Whether any segment of this path matches the digest pattern.
    pub fn has_digest_segment(&self) -> bool {
        self.digest_segment_index().is_some()
    }

    /// Split into (base, digest segment) at the first digest-marker
    /// segment. Returns `None` for plain mutable paths or when the
    /// digest segment is the very first segment (no base to anchor to).
    pub fn split_at_digest(&self) -> Option<(StorePath, &str)> {
        let idx = self.digest_segment_index()?;
        if idx == 0 {
            return None;
        }
        let base = StorePath {
            segments: self.segments[..idx].to_vec(),
        };
        Some((base, &self.segments[idx]))
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

impl FromStr for StorePath {
    type Err = PathError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StorePath::parse(s)
    }
}

impl Serialize for StorePath {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for StorePath {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        StorePath::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let path = StorePath::parse("/users/abc/profile/").unwrap();
        assert_eq!(path.segments(), ["users", "abc", "profile"]);
        assert_eq!(path.to_string(), "users/abc/profile");
    }

    #[test]
    fn test_percent_decoding() {
        let path = StorePath::parse("users/abc/my%20file").unwrap();
        assert_eq!(path.segments()[2], "my file");

        // Encoded separators decode into the segment, they do not split it
        let path = StorePath::parse("users/a%2Fb").unwrap();
        assert_eq!(path.segments(), ["users", "a/b"]);
    }

    #[test]
    fn test_empty_path() {
        assert_eq!(StorePath::parse("//"), Err(PathError::Empty));
        assert_eq!(StorePath::parse(""), Err(PathError::Empty));
    }

    #[test]
    fn test_parent_walk() {
        let path = StorePath::parse("users/abc/docs/note").unwrap();
        let mut walked = Vec::new();
        let mut cur = Some(path);
        while let Some(p) = cur {
            walked.push(p.to_string());
            cur = p.parent();
        }
        assert_eq!(
            walked,
            ["users/abc/docs/note", "users/abc/docs", "users/abc", "users"]
        );
    }

    #[test]
    fn test_prefix() {
        let base = StorePath::parse("users/abc").unwrap();
        let deep = StorePath::parse("users/abc/docs").unwrap();
        let other = StorePath::parse("users/abcd").unwrap();
        assert!(base.is_prefix_of(&deep));
        assert!(base.is_prefix_of(&base));
        // Segment-wise comparison, not string-prefix comparison
        assert!(!base.is_prefix_of(&other));
    }

    #[test]
    fn test_namespace() {
        assert!(StorePath::parse("users/abc").unwrap().in_user_namespace());
        assert!(!StorePath::parse("public/abc").unwrap().in_user_namespace());
    }
}
