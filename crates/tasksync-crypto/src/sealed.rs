//! Anonymous sealed-box encryption.
//!
//! `seal` needs only the recipient's public key: it generates an ephemeral
//! X25519 keypair, derives a symmetric key from the ECDH shared secret via
//! HKDF-SHA256, encrypts with AES-256-GCM, and prepends the ephemeral
//! public key and nonce. Any holder of the matching private key, and only
//! that holder, can `open` the result. There is no sender signature; the
//! sealing party cannot decrypt its own output, which is exactly why the
//! sync server is allowed to perform the encryption.
//!
//! Output layout (fixed compatibility contract between independently built
//! ends): `ephemeral_pk (32) || nonce (12) || AES-256-GCM ciphertext+tag`.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroize;

use crate::error::{CryptoError, CryptoResult};
use crate::keys::PublicKey;
#[cfg(feature = "open")]
use crate::keys::PrivateKey;

/// Length of the ephemeral public key prefix.
pub const EPHEMERAL_KEY_LEN: usize = 32;
/// Length of the AES-GCM nonce.
pub const NONCE_LEN: usize = 12;
/// Length of the AES-GCM authentication tag.
pub const TAG_LEN: usize = 16;

/// Domain separation context for HKDF.
const HKDF_INFO: &[u8] = b"tasksync-sealed-box-v1";

/// Derive the AES-256-GCM key from an ECDH shared secret.
///
/// The ephemeral public key doubles as the HKDF salt, so both ends derive
/// the same key from the bytes already on the wire.
fn derive_key(shared_secret: &[u8; 32], ephemeral_pk: &[u8; 32]) -> [u8; 32] {
    let hkdf = Hkdf::<Sha256>::new(Some(ephemeral_pk), shared_secret);
    let mut key = [0u8; 32];
    // Expand cannot fail with a 32-byte output
    hkdf.expand(HKDF_INFO, &mut key)
        .expect("HKDF expand with 32-byte output");
    key
}

/// Seal a plaintext to a recipient's public key.
///
/// Each call generates a fresh ephemeral keypair and nonce, so sealing the
/// same plaintext twice yields different ciphertexts.
#[cfg(feature = "seal")]
pub fn seal(plaintext: &[u8], recipient: &PublicKey) -> CryptoResult<Vec<u8>> {
    use rand::RngCore;

    let mut rng = rand::thread_rng();

    let ephemeral_secret = x25519_dalek::EphemeralSecret::random_from_rng(&mut rng);
    let ephemeral_public = x25519_dalek::PublicKey::from(&ephemeral_secret);

    let shared = ephemeral_secret.diffie_hellman(&recipient.to_x25519());
    let mut key = derive_key(shared.as_bytes(), ephemeral_public.as_bytes());

    let mut nonce_bytes = [0u8; NONCE_LEN];
    rng.fill_bytes(&mut nonce_bytes);

    let cipher =
        Aes256Gcm::new_from_slice(&key).map_err(|e| CryptoError::Encryption(e.to_string()))?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;
    key.zeroize();

    let mut output = Vec::with_capacity(EPHEMERAL_KEY_LEN + NONCE_LEN + ciphertext.len());
    output.extend_from_slice(ephemeral_public.as_bytes());
    output.extend_from_slice(&nonce_bytes);
    output.extend_from_slice(&ciphertext);
    Ok(output)
}

/// Open a sealed box with the recipient's private key.
///
/// Fails with [`CryptoError::Decryption`] if the input is truncated, was
/// sealed to a different public key, or the authentication tag does not
/// verify. Never returns wrong plaintext silently.
#[cfg(feature = "open")]
pub fn open(ciphertext: &[u8], private_key: &PrivateKey) -> CryptoResult<Vec<u8>> {
    if ciphertext.len() < EPHEMERAL_KEY_LEN + NONCE_LEN + TAG_LEN {
        return Err(CryptoError::Decryption(format!(
            "truncated sealed box: {} bytes",
            ciphertext.len()
        )));
    }

    let (ephemeral_bytes, rest) = ciphertext.split_at(EPHEMERAL_KEY_LEN);
    let (nonce_bytes, sealed) = rest.split_at(NONCE_LEN);

    let ephemeral_pk: [u8; 32] = ephemeral_bytes
        .try_into()
        .expect("split_at yields exactly EPHEMERAL_KEY_LEN bytes");

    let shared = private_key
        .to_x25519()
        .diffie_hellman(&x25519_dalek::PublicKey::from(ephemeral_pk));
    let mut key = derive_key(shared.as_bytes(), &ephemeral_pk);

    let cipher =
        Aes256Gcm::new_from_slice(&key).map_err(|e| CryptoError::Decryption(e.to_string()))?;
    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce_bytes), sealed)
        .map_err(|_| CryptoError::Decryption("wrong key or tampered data".to_string()));
    key.zeroize();

    plaintext
}
