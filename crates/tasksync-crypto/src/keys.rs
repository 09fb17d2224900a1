//! X25519 key types and seeded keypair generation.
//!
//! Keypairs here are never random in the sync protocol: they are expanded
//! deterministically from the 32-byte seed the password KDF produces, so
//! the same credentials rederive byte-identical keys on any device. Seeded
//! generation is `StaticSecret::from(seed)`, a documented, stable
//! construction (the library performs the Curve25519 clamping).

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use x25519_dalek::PublicKey as X25519Public;
#[cfg(feature = "open")]
use x25519_dalek::StaticSecret;
#[cfg(feature = "open")]
use zeroize::{Zeroize, ZeroizeOnDrop};

/// X25519 public key (32 bytes).
///
/// Public keys can be freely shared; the server stores one per identity
/// and seals every stored payload to it.
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKey([u8; 32]);

impl PublicKey {
    /// Create a public key from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes of the public key.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hex SHA-256 of the raw key bytes, the server-side identity hash.
    pub fn hash(&self) -> String {
        public_key_hash(&self.0)
    }

    pub(crate) fn to_x25519(&self) -> X25519Public {
        X25519Public::from(self.0)
    }
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PublicKey({})", hex::encode(&self.0[..8]))
    }
}

impl Serialize for PublicKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("invalid public key length"))?;
        Ok(Self(arr))
    }
}

/// Compute the hex SHA-256 identity hash of raw public key bytes.
///
/// Not a secret: it exists so the server can recognize repeat identities
/// and verify a client's claimed public key.
pub fn public_key_hash(public_key: &[u8]) -> String {
    hex::encode(Sha256::digest(public_key))
}

/// X25519 private key (32 bytes) with automatic zeroization.
#[cfg(feature = "open")]
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey([u8; 32]);

#[cfg(feature = "open")]
impl PrivateKey {
    /// Create a private key from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes of the private key.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub(crate) fn to_x25519(&self) -> StaticSecret {
        StaticSecret::from(self.0)
    }

    /// Derive the corresponding public key.
    pub fn public_key(&self) -> PublicKey {
        let secret = self.to_x25519();
        let public = X25519Public::from(&secret);
        PublicKey(*public.as_bytes())
    }
}

#[cfg(feature = "open")]
impl Clone for PrivateKey {
    fn clone(&self) -> Self {
        Self(self.0)
    }
}

#[cfg(feature = "open")]
impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// X25519 keypair expanded from a KDF seed.
#[cfg(feature = "open")]
pub struct Keypair {
    /// The public key (can be shared).
    pub public: PublicKey,
    /// The private key (must be kept secret).
    pub private: PrivateKey,
}

#[cfg(feature = "open")]
impl Keypair {
    /// Expand a 32-byte seed into a keypair.
    ///
    /// Deterministic: the same seed always yields the same keypair.
    pub fn from_seed(seed: [u8; 32]) -> Self {
        let secret = StaticSecret::from(seed);
        let public = X25519Public::from(&secret);
        Self {
            public: PublicKey(*public.as_bytes()),
            private: PrivateKey(secret.to_bytes()),
        }
    }
}

#[cfg(feature = "open")]
impl std::fmt::Debug for Keypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keypair")
            .field("public", &self.public)
            .field("private", &"[REDACTED]")
            .finish()
    }
}
