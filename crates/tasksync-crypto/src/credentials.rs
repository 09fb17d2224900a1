//! Credential derivation: (user id, password) to a full sync identity.
//!
//! Derived once per login and cached by the client. Re-derivation from the
//! same inputs is byte-identical across runs and platforms; nothing is ever
//! transmitted or stored to make that so.

use crate::error::CryptoResult;
use crate::kdf::derive_seed;
use crate::keys::{Keypair, PrivateKey, PublicKey};

/// Everything the client needs to sync: keys plus the identity hash.
pub struct SyncCredentials {
    pub user_id: String,
    pub public_key: PublicKey,
    pub public_key_hash: String,
    pub private_key: PrivateKey,
}

impl SyncCredentials {
    /// Derive credentials from a user id and password.
    ///
    /// PBKDF2 stretches the password (user id as salt) into a seed, the
    /// seed expands into an X25519 keypair, and the identity hash is the
    /// hex SHA-256 of the public key.
    pub fn derive(user_id: &str, password: &str) -> CryptoResult<Self> {
        let seed = derive_seed(user_id, password)?;
        let keypair = Keypair::from_seed(seed.to_bytes());
        let public_key_hash = keypair.public.hash();

        Ok(Self {
            user_id: user_id.to_string(),
            public_key: keypair.public,
            public_key_hash,
            private_key: keypair.private,
        })
    }

    /// Hex encoding of the public key for the wire.
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key.as_bytes())
    }
}

impl std::fmt::Debug for SyncCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncCredentials")
            .field("user_id", &self.user_id)
            .field("public_key_hash", &self.public_key_hash)
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

#[cfg(all(test, feature = "seal"))]
mod tests {
    use super::*;
    use crate::sealed::{open, seal};

    #[test]
    fn test_derive_deterministic() {
        let a = SyncCredentials::derive("alice123", "hunter2hunter2").unwrap();
        let b = SyncCredentials::derive("alice123", "hunter2hunter2").unwrap();

        assert_eq!(a.public_key.as_bytes(), b.public_key.as_bytes());
        assert_eq!(a.private_key.as_bytes(), b.private_key.as_bytes());
        assert_eq!(a.public_key_hash, b.public_key_hash);
    }

    #[test]
    fn test_distinct_inputs_distinct_identities() {
        let alice = SyncCredentials::derive("alice123", "password one").unwrap();
        let aliss = SyncCredentials::derive("aliss123", "password one").unwrap();
        let other = SyncCredentials::derive("alice123", "password two").unwrap();

        assert_ne!(alice.public_key_hash, aliss.public_key_hash);
        assert_ne!(alice.public_key_hash, other.public_key_hash);
        assert_eq!(alice.public_key_hash.len(), 64);
    }

    #[test]
    fn test_hash_matches_public_key() {
        let creds = SyncCredentials::derive("alice123", "some password").unwrap();
        assert_eq!(creds.public_key_hash, creds.public_key.hash());
    }

    #[test]
    fn test_derived_keys_seal_roundtrip() {
        // A server knowing only the public key can seal; the re-derived
        // private key on another "device" opens it.
        let device_a = SyncCredentials::derive("alice123", "shared password").unwrap();
        let device_b = SyncCredentials::derive("alice123", "shared password").unwrap();

        let sealed = seal(b"cross-device payload", &device_a.public_key).unwrap();
        let opened = open(&sealed, &device_b.private_key).unwrap();
        assert_eq!(opened, b"cross-device payload");
    }

    #[test]
    fn test_debug_redacts_private_key() {
        let creds = SyncCredentials::derive("alice123", "hunter2hunter2").unwrap();
        let debug = format!("{:?}", creds);
        assert!(debug.contains("REDACTED"));
        assert!(debug.contains("alice123"));
    }
}
