//! API token generation.
//!
//! Tokens are random bytes from the thread-local CSPRNG, encoded as
//! unpadded base64url. With the default 48 bytes that is a 64-character
//! string, the width of the `api_tokens.token` column.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use tracing::debug;

use crate::errors::{IdentityError, Result};

/// Default entropy per token.
pub const DEFAULT_ENTROPY_BYTES: usize = 48;

/// Default number of candidates tried before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 99;

/// Produces candidate API token values.
pub trait TokenSource: Send + Sync {
    /// Produce one candidate. Uniqueness is checked by the caller.
    fn generate(&self) -> String;
}

/// Cryptographically random URL-safe tokens.
#[derive(Clone, Copy, Debug)]
pub struct RandomTokenSource {
    entropy_bytes: usize,
}

impl RandomTokenSource {
    /// Source drawing `entropy_bytes` random bytes per token.
    pub fn new(entropy_bytes: usize) -> Self {
        Self { entropy_bytes }
    }
}

impl Default for RandomTokenSource {
    fn default() -> Self {
        Self::new(DEFAULT_ENTROPY_BYTES)
    }
}

impl TokenSource for RandomTokenSource {
    fn generate(&self) -> String {
        let mut bytes = vec![0u8; self.entropy_bytes];
        rand::rng().fill_bytes(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }
}

/// Draw candidates from `source` until `is_taken` reports one as free.
///
/// Fails with [`IdentityError::TokenGenerationExhausted`] after
/// `max_attempts` collisions.
pub fn generate_unique_token(
    source: &dyn TokenSource,
    max_attempts: u32,
    mut is_taken: impl FnMut(&str) -> Result<bool>,
) -> Result<String> {
    for attempt in 1..=max_attempts {
        let candidate = source.generate();
        if !is_taken(&candidate)? {
            return Ok(candidate);
        }
        debug!(attempt, "generated api token already in use, retrying");
    }
    Err(IdentityError::TokenGenerationExhausted {
        attempts: max_attempts,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::collections::HashSet;
    use std::sync::Mutex;

    struct Scripted(Mutex<Vec<&'static str>>);

    impl TokenSource for Scripted {
        fn generate(&self) -> String {
            self.0.lock().unwrap().remove(0).to_string()
        }
    }

    #[test]
    fn default_token_is_64_url_safe_chars() {
        let token = RandomTokenSource::default().generate();
        assert_eq!(token.len(), 64);
        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn tokens_differ() {
        let source = RandomTokenSource::default();
        let tokens: HashSet<String> = (0..1000).map(|_| source.generate()).collect();
        assert_eq!(tokens.len(), 1000);
    }

    #[test]
    fn skips_taken_candidates() {
        let source = Scripted(Mutex::new(vec!["a", "b", "c"]));
        let taken = ["a", "b"];
        let token = generate_unique_token(&source, 5, |t| Ok(taken.contains(&t))).unwrap();
        assert_eq!(token, "c");
    }

    #[test]
    fn exhaustion_after_max_attempts() {
        let source = RandomTokenSource::default();
        let mut calls = 0;
        let err = generate_unique_token(&source, 99, |_| {
            calls += 1;
            Ok(true)
        })
        .unwrap_err();
        assert_matches!(err, IdentityError::TokenGenerationExhausted { attempts: 99 });
        assert_eq!(calls, 99);
    }

    #[test]
    fn lookup_errors_propagate() {
        let source = RandomTokenSource::default();
        let err = generate_unique_token(&source, 3, |_| {
            Err(IdentityError::Internal("lookup failed".into()))
        })
        .unwrap_err();
        assert_matches!(err, IdentityError::Internal(_));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn encoded_length_matches_entropy(entropy in 1usize..=48) {
                let token = RandomTokenSource::new(entropy).generate();
                prop_assert_eq!(token.len(), (entropy * 4).div_ceil(3));
                prop_assert!(token.len() <= 64);
                prop_assert!(URL_SAFE_NO_PAD.decode(&token).is_ok());
            }
        }
    }
}
