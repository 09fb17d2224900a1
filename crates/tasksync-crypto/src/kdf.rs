//! Password stretching for credential derivation.
//!
//! PBKDF2-HMAC-SHA256 with the user id used verbatim as salt. The salt must
//! be something the user supplies consistently and the server never stores,
//! so the same (user id, password) pair rederives the same seed on any
//! device with no salt storage or transmission. Determinism here is the
//! linchpin of the whole scheme: there is no key-exchange handshake.

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CryptoError, CryptoResult};

/// PBKDF2 iteration count. Part of the compatibility contract between
/// independently built clients; changing it changes every derived key.
pub const PBKDF2_ITERATIONS: u32 = 600_000;

/// A 32-byte KDF seed with automatic zeroization on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Seed([u8; 32]);

impl Seed {
    /// Get the seed bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Copy out the seed for keypair expansion.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0
    }
}

impl std::fmt::Debug for Seed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Seed").field("seed", &"[REDACTED]").finish()
    }
}

/// Stretch a password into a 256-bit seed.
///
/// Empty inputs are a precondition violation, not a runtime condition to
/// recover from, and are rejected up front.
pub fn derive_seed(user_id: &str, password: &str) -> CryptoResult<Seed> {
    if user_id.is_empty() {
        return Err(CryptoError::InvalidInput("empty user id".to_string()));
    }
    if password.is_empty() {
        return Err(CryptoError::InvalidInput("empty password".to_string()));
    }

    let mut seed = [0u8; 32];
    pbkdf2_hmac::<Sha256>(
        password.as_bytes(),
        user_id.as_bytes(),
        PBKDF2_ITERATIONS,
        &mut seed,
    );
    Ok(Seed(seed))
}

#[cfg(test)]
mod tests {
    use super::*;

    // The full 600k-iteration derivation runs in well under a second on
    // anything modern; tests use it directly rather than a reduced count so
    // they exercise the production parameters.

    #[test]
    fn test_derive_seed_deterministic() {
        let seed1 = derive_seed("alice123", "correct horse battery").unwrap();
        let seed2 = derive_seed("alice123", "correct horse battery").unwrap();
        assert_eq!(seed1.as_bytes(), seed2.as_bytes());
    }

    #[test]
    fn test_different_users_different_seeds() {
        let seed1 = derive_seed("alice123", "same password").unwrap();
        let seed2 = derive_seed("bobby456", "same password").unwrap();
        assert_ne!(seed1.as_bytes(), seed2.as_bytes());
    }

    #[test]
    fn test_different_passwords_different_seeds() {
        let seed1 = derive_seed("alice123", "password one").unwrap();
        let seed2 = derive_seed("alice123", "password two").unwrap();
        assert_ne!(seed1.as_bytes(), seed2.as_bytes());
    }

    #[test]
    fn test_empty_inputs_rejected() {
        assert!(matches!(
            derive_seed("", "password"),
            Err(CryptoError::InvalidInput(_))
        ));
        assert!(matches!(
            derive_seed("alice123", ""),
            Err(CryptoError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_seed_debug_redacted() {
        let seed = derive_seed("alice123", "password").unwrap();
        assert!(format!("{:?}", seed).contains("REDACTED"));
    }
}
