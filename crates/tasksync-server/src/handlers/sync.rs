//! The two-phase sync handler.
//!
//! One logical operation, invoked up to twice per sync cycle:
//!
//! - Phase 1 (`merged: false`): if a record already exists its stored
//!   ciphertext comes back with `needsMerge: true` and the store stays
//!   untouched. Otherwise the request data is sealed and stored.
//! - Phase 2 (`merged: true`): the merged collection is sealed and stored
//!   unconditionally. No optimistic-concurrency check is made against the
//!   version the client last saw; the later of two concurrent phase-2
//!   writes wins.
//!
//! Authentication and auto-registration share this call shape: the public
//! key rides on every request, its hash is verified before any store
//! access, and an unknown user id with consistent credentials is created
//! on the spot.

use axum::{
    extract::{Path, State},
    Json,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use tracing::{debug, info};

use tasksync_core::{SyncRequest, SyncResponse};
use tasksync_crypto::{public_key_hash, seal, PublicKey};

use crate::error::ApiError;
use crate::state::AppState;

/// POST /api/v1/sync/{user_id}
pub async fn sync(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<SyncRequest>,
) -> Result<Json<SyncResponse>, ApiError> {
    req.validate(&user_id)?;
    let key_bytes = req.public_key_bytes()?;

    // Claimed hash must match the claimed key, before any store access.
    if public_key_hash(&key_bytes) != req.public_key_hash {
        return Err(ApiError::Unauthorized);
    }

    let store = state.store().await?;

    let identity = match store.identity(&user_id).await? {
        Some(identity) => identity,
        None => {
            info!(user_id, "auto-registering new identity");
            store
                .create_identity(&user_id, &key_bytes, &req.public_key_hash)
                .await?
        }
    };

    // A returning user must present the registered credentials.
    if identity.public_key_hash != req.public_key_hash {
        return Err(ApiError::Unauthorized);
    }

    let record = store.record(&user_id).await?;
    let stored_ciphertext = record.as_ref().and_then(|r| r.ciphertext.clone());

    if let (Some(record), Some(ciphertext)) = (&record, &stored_ciphertext) {
        if !req.merged {
            // A copy already exists and the client has not merged against
            // it: hand the stored ciphertext back untouched.
            debug!(user_id, version = record.version, "merge required");
            return Ok(Json(SyncResponse {
                encrypted_data: BASE64.encode(ciphertext),
                version: record.version,
                needs_merge: true,
            }));
        }
    }

    // First write for this identity, or a phase-2 commit: seal the payload
    // to the user's public key and overwrite the record.
    let plaintext = serde_json::to_vec(&req.data).map_err(tasksync_core::Error::from)?;
    let sealed = seal(&plaintext, &PublicKey::from_bytes(key_bytes))?;
    let version = store.put_record(&user_id, &sealed).await?;

    info!(user_id, version, merged = req.merged, "record stored");
    Ok(Json(SyncResponse {
        encrypted_data: BASE64.encode(&sealed),
        version,
        needs_merge: false,
    }))
}
