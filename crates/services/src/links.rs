//! # Shareable Links
//!
//! Random, URL-safe board codes. Uniqueness is not checked here: the store's
//! unique constraint rejects collisions and `BoardService::create_board`
//! retries with a fresh code.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use domains::{DomainError, Result};

pub const DEFAULT_LINK_LENGTH: usize = 12;

#[cfg_attr(test, mockall::automock)]
pub trait LinkGenerator: Send + Sync {
    fn issue(&self) -> Result<String>;
}

/// Draws from the OS entropy source and encodes with the base64url alphabet.
/// Every character carries six bits, so the default length gives 72 bits.
#[derive(Debug, Clone)]
pub struct RandomLinkGenerator {
    length: usize,
}

impl RandomLinkGenerator {
    pub fn new(length: usize) -> Self {
        Self { length: length.max(1) }
    }
}

impl Default for RandomLinkGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_LINK_LENGTH)
    }
}

impl LinkGenerator for RandomLinkGenerator {
    fn issue(&self) -> Result<String> {
        let mut bytes = vec![0u8; (self.length * 3).div_ceil(4)];
        getrandom::getrandom(&mut bytes)
            .map_err(|e| DomainError::ResourceExhausted(format!("entropy source failed: {e}")))?;
        let mut code = URL_SAFE_NO_PAD.encode(&bytes);
        code.truncate(self.length);
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_default_code_is_twelve_url_safe_chars() {
        let code = RandomLinkGenerator::default().issue().unwrap();
        assert_eq!(code.len(), 12);
        assert!(code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_honours_odd_lengths() {
        for len in [1, 5, 7, 13, 32] {
            assert_eq!(RandomLinkGenerator::new(len).issue().unwrap().len(), len);
        }
    }

    #[test]
    fn test_codes_do_not_repeat_in_practice() {
        let generator = RandomLinkGenerator::default();
        let codes: HashSet<_> = (0..10_000).map(|_| generator.issue().unwrap()).collect();
        assert_eq!(codes.len(), 10_000);
    }
}
