//! # auth-adapters
//!
//! HMAC-SHA256 implementation of `IdentityHasher`.
//! Turns the anonymous board cookie into the identity string every
//! authorization check runs against.

use domains::traits::IdentityHasher;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub struct HmacIdentityHasher {
    /// Server-side key. Rotating it re-keys every identity.
    salt: SecretString,
}

impl HmacIdentityHasher {
    /// Accepts a salt (e.g., from `auth.identity_salt` in the settings)
    pub fn new(salt: SecretString) -> Self {
        Self { salt }
    }
}

impl IdentityHasher for HmacIdentityHasher {
    /// Lowercase hex of HMAC-SHA256(salt, credential), 64 characters.
    fn hash(&self, credential: &str) -> String {
        // HMAC accepts keys of any length, so this cannot fail.
        let mut mac = match HmacSha256::new_from_slice(self.salt.expose_secret().as_bytes()) {
            Ok(mac) => mac,
            Err(_) => unreachable!("HMAC key length is unrestricted"),
        };
        mac.update(credential.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}
