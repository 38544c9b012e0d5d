//! Cryptographic identity primitives.

mod keys;

pub use keys::{KeyError, PublicKey, SecretKey, PRIVATE_KEY_SIZE, PUBLIC_KEY_SIZE};
