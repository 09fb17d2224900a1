//! Wire protocol types for the two-phase sync exchange.
//!
//! One logical call, invoked up to twice per sync cycle:
//!
//! ```text
//! POST /api/v1/sync/{user_id}
//! { "publicKeyHash": "...", "publicKey": "...", "data": {...}, "merged": false }
//! -> { "encryptedData": "...", "version": 3, "needsMerge": true }
//! ```
//!
//! The public key rides on every request, not only the first, so the server
//! can authenticate existing users and auto-register new ones from the same
//! call shape. Field names are camelCase on the wire; `encryptedData` is
//! base64, `publicKey`/`publicKeyHash` are hex.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{validate_user_id, TaskCollection};

/// Client request body for both phases of a sync cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    /// Hex SHA-256 of `public_key`'s raw bytes.
    pub public_key_hash: String,
    /// Hex-encoded X25519 public key.
    pub public_key: String,
    /// The full plaintext working copy.
    pub data: TaskCollection,
    /// False on phase 1, true when resubmitting a merged collection.
    #[serde(default)]
    pub merged: bool,
}

impl SyncRequest {
    /// Structural validation, rejected before any store or crypto work.
    ///
    /// Errors name the offending field; they carry no identity information.
    pub fn validate(&self, user_id: &str) -> Result<()> {
        validate_user_id(user_id)?;
        if self.public_key_hash.is_empty() {
            return Err(Error::InvalidInput("publicKeyHash is required".to_string()));
        }
        if self.public_key.is_empty() {
            return Err(Error::InvalidInput("publicKey is required".to_string()));
        }
        let key_bytes = hex::decode(&self.public_key)
            .map_err(|_| Error::InvalidInput("publicKey must be hex".to_string()))?;
        if key_bytes.len() != 32 {
            return Err(Error::InvalidInput(
                "publicKey must be 32 bytes".to_string(),
            ));
        }
        if hex::decode(&self.public_key_hash).is_err() {
            return Err(Error::InvalidInput(
                "publicKeyHash must be hex".to_string(),
            ));
        }
        Ok(())
    }

    /// Decode the hex public key. Call after [`SyncRequest::validate`].
    pub fn public_key_bytes(&self) -> Result<[u8; 32]> {
        let bytes = hex::decode(&self.public_key)
            .map_err(|_| Error::InvalidInput("publicKey must be hex".to_string()))?;
        bytes
            .try_into()
            .map_err(|_| Error::InvalidInput("publicKey must be 32 bytes".to_string()))
    }
}

/// Server response for both phases.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    /// Base64 sealed-box ciphertext. On a `needs_merge` response this is
    /// the previously stored ciphertext, untouched.
    pub encrypted_data: String,
    /// The stored record's write counter.
    pub version: i64,
    /// True when the client must merge and resubmit.
    pub needs_merge: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_request() -> SyncRequest {
        let key = [7u8; 32];
        SyncRequest {
            public_key_hash: hex::encode([1u8; 32]),
            public_key: hex::encode(key),
            data: TaskCollection::default(),
            merged: false,
        }
    }

    #[test]
    fn test_wire_names_are_camel_case() {
        let json = serde_json::to_value(valid_request()).unwrap();
        assert!(json.get("publicKeyHash").is_some());
        assert!(json.get("publicKey").is_some());
        assert!(json.get("merged").is_some());

        let response = SyncResponse {
            encrypted_data: "AAAA".to_string(),
            version: 1,
            needs_merge: false,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("encryptedData").is_some());
        assert!(json.get("needsMerge").is_some());
    }

    #[test]
    fn test_merged_defaults_to_false() {
        let json = r#"{"publicKeyHash":"00","publicKey":"00","data":{}}"#;
        let parsed: SyncRequest = serde_json::from_str(json).unwrap();
        assert!(!parsed.merged);
    }

    #[test]
    fn test_validate_accepts_well_formed() {
        assert!(valid_request().validate("alice123").is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_user_id() {
        assert!(valid_request().validate("short").is_err());
        assert!(valid_request().validate("Alice123").is_err());
    }

    #[test]
    fn test_validate_rejects_missing_fields() {
        let mut req = valid_request();
        req.public_key_hash = String::new();
        let err = req.validate("alice123").unwrap_err();
        assert!(err.to_string().contains("publicKeyHash"));

        let mut req = valid_request();
        req.public_key = String::new();
        let err = req.validate("alice123").unwrap_err();
        assert!(err.to_string().contains("publicKey"));
    }

    #[test]
    fn test_validate_rejects_non_hex_and_wrong_length() {
        let mut req = valid_request();
        req.public_key = "not hex at all".to_string();
        assert!(req.validate("alice123").is_err());

        let mut req = valid_request();
        req.public_key = hex::encode([0u8; 16]);
        assert!(req.validate("alice123").is_err());
    }

    #[test]
    fn test_public_key_bytes_roundtrip() {
        let req = valid_request();
        assert_eq!(req.public_key_bytes().unwrap(), [7u8; 32]);
    }
}
