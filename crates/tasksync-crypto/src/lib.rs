//! # tasksync-crypto
//!
//! Cryptographic primitives for tasksync: deterministic password-derived
//! keypairs and anonymous sealed-box encryption. Together they let the sync
//! server authenticate a user and store their data durably while being
//! cryptographically incapable of reading it.
//!
//! ## Cryptographic Primitives
//!
//! - **Password stretching**: PBKDF2-HMAC-SHA256, 600,000 iterations,
//!   user id as salt (no salt storage or transmission needed)
//! - **Key exchange**: X25519 (Curve25519 ECDH), seeded deterministically
//!   from the stretched password
//! - **Symmetric cipher**: AES-256-GCM (AEAD)
//! - **Key derivation**: HKDF-SHA256 with a fixed domain-separation string
//! - **Identity hash**: SHA-256 of the raw public key bytes, hex encoded
//!
//! ## Sealed-Box Layout
//!
//! The two ends may be built independently, so the layout is a
//! compatibility contract, not an implementation detail:
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │ Ephemeral X25519 public key (32 bytes)          │
//! ├─────────────────────────────────────────────────┤
//! │ AES-GCM nonce (12 bytes)                        │
//! ├─────────────────────────────────────────────────┤
//! │ AES-256-GCM ciphertext + tag                    │
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! ## Feature Flags
//!
//! The `seal` feature exposes the encrypt-only surface; `open` exposes the
//! private-key surface (decryption, the password KDF, and credential
//! derivation). The server depends on this crate with
//! `default-features = false, features = ["seal"]`, which removes every
//! decryption entry point from that binary at link time.

pub mod error;
pub mod keys;

#[cfg(feature = "open")]
pub mod credentials;
#[cfg(feature = "open")]
pub mod kdf;
pub mod sealed;

pub use error::{CryptoError, CryptoResult};
pub use keys::{public_key_hash, PublicKey};

#[cfg(feature = "open")]
pub use credentials::SyncCredentials;
#[cfg(feature = "open")]
pub use keys::{Keypair, PrivateKey};
#[cfg(feature = "open")]
pub use sealed::open;
#[cfg(feature = "seal")]
pub use sealed::seal;
