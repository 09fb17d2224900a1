//! The sync session controller.
//!
//! A session walks the states `Preparing -> AwaitingPhase1 -> Decrypting
//! -> [Merging -> AwaitingPhase2] -> Committing`. Failure at any point
//! aborts the whole session; the caller's local state is only replaced by
//! the value a successful session returns.
//!
//! Concurrency discipline: exactly one session may be in flight per
//! controller. The busy flag is checked and set before the first suspension
//! point, so a second concurrent call observes it deterministically and is
//! dropped, not queued. Bursts of triggers are coalesced by
//! [`SyncController::request_sync`]: each trigger bumps a generation
//! counter and sleeps out the debounce window, and only the trigger that
//! still owns the latest generation actually runs.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::Utc;
use sha2::{Digest, Sha256};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use tasksync_core::{
    merge_collections, Error, Result, SyncRequest, SyncResponse, TaskCollection, Tombstones,
};
use tasksync_crypto::{open, SyncCredentials};

/// Default debounce window for [`SyncController::request_sync`].
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(3);

/// Why a requested sync did not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Another session was already in flight.
    Busy,
    /// A newer trigger superseded this one inside the debounce window.
    Debounced,
    /// The collection is unchanged since the last committed session.
    Unchanged,
}

/// Result of a sync attempt.
#[derive(Debug)]
pub enum SyncOutcome {
    /// The session completed; `collection` is the new authoritative local
    /// state.
    Committed {
        collection: TaskCollection,
        version: i64,
        /// True when this cycle needed the second phase.
        merged: bool,
    },
    /// The session did not run. Not an error; observable via logs.
    Skipped(SkipReason),
}

/// Client-side orchestrator for the two-phase sync protocol.
pub struct SyncController {
    creds: SyncCredentials,
    http: reqwest::Client,
    base_url: String,
    debounce: Duration,
    busy: AtomicBool,
    generation: AtomicU64,
    last_fingerprint: Mutex<Option<String>>,
}

impl SyncController {
    /// Create a controller for one identity against one server.
    pub fn new(base_url: impl Into<String>, creds: SyncCredentials) -> Self {
        Self {
            creds,
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            debounce: DEFAULT_DEBOUNCE,
            busy: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            last_fingerprint: Mutex::new(None),
        }
    }

    /// Override the debounce window (tests use a short one).
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Debounced entry point for local-data-change events.
    ///
    /// Each call resets the window; only the last trigger within it runs a
    /// session. Earlier triggers resolve to `Skipped(Debounced)`.
    pub fn request_sync(
        self: &Arc<Self>,
        collection: TaskCollection,
        tombstones: Tombstones,
    ) -> JoinHandle<Result<SyncOutcome>> {
        let token = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let controller = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(controller.debounce).await;
            if controller.generation.load(Ordering::SeqCst) != token {
                debug!("sync trigger superseded within debounce window");
                return Ok(SyncOutcome::Skipped(SkipReason::Debounced));
            }
            controller.sync_now(&collection, &tombstones).await
        })
    }

    /// Run one full sync session immediately.
    ///
    /// Returns `Skipped(Busy)` if a session is already in flight and
    /// `Skipped(Unchanged)` if nothing changed since the last commit.
    pub async fn sync_now(
        &self,
        collection: &TaskCollection,
        tombstones: &Tombstones,
    ) -> Result<SyncOutcome> {
        // Checked and set before any suspension point.
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!(user_id = %self.creds.user_id, "sync skipped: session in flight");
            return Ok(SyncOutcome::Skipped(SkipReason::Busy));
        }

        let result = self.run_session(collection, tombstones).await;
        self.busy.store(false, Ordering::SeqCst);

        if let Err(ref e) = result {
            warn!(user_id = %self.creds.user_id, error = %e, "sync session aborted");
        }
        result
    }

    async fn run_session(
        &self,
        collection: &TaskCollection,
        tombstones: &Tombstones,
    ) -> Result<SyncOutcome> {
        let fingerprint = fingerprint(collection, tombstones)?;
        if self.last_fingerprint.lock().expect("fingerprint lock").as_deref()
            == Some(fingerprint.as_str())
        {
            debug!(user_id = %self.creds.user_id, "sync skipped: unchanged");
            return Ok(SyncOutcome::Skipped(SkipReason::Unchanged));
        }

        // Preparing: blanket re-stamp of every entity, then serialize.
        let mut local = collection.clone();
        local.stamp_all(Utc::now());

        // AwaitingPhase1
        let response = self.post(&local, false).await?;

        let outcome = if !response.needs_merge {
            // Decrypting: the server copy is authoritative.
            let remote = self.decrypt(&response.encrypted_data)?;
            SyncOutcome::Committed {
                collection: remote,
                version: response.version,
                merged: false,
            }
        } else {
            // Decrypting + Merging
            let remote = self.decrypt(&response.encrypted_data)?;
            let merged = merge_collections(&local, &remote, tombstones);

            // AwaitingPhase2: the response acknowledges the write; the
            // just-computed merged plaintext is what becomes local state.
            let ack = self.post(&merged, true).await?;
            if ack.needs_merge {
                return Err(Error::Internal(
                    "server requested a merge of already-merged data".to_string(),
                ));
            }
            SyncOutcome::Committed {
                collection: merged,
                version: ack.version,
                merged: true,
            }
        };

        // Committing
        if let SyncOutcome::Committed {
            collection: committed,
            version,
            merged,
        } = &outcome
        {
            let committed_fingerprint = self::fingerprint(committed, tombstones)?;
            *self.last_fingerprint.lock().expect("fingerprint lock") = Some(committed_fingerprint);
            info!(
                user_id = %self.creds.user_id,
                version,
                merged,
                "sync committed"
            );
        }
        Ok(outcome)
    }

    async fn post(&self, data: &TaskCollection, merged: bool) -> Result<SyncResponse> {
        let request = SyncRequest {
            public_key_hash: self.creds.public_key_hash.clone(),
            public_key: self.creds.public_key_hex(),
            data: data.clone(),
            merged,
        };
        let url = format!("{}/api/v1/sync/{}", self.base_url, self.creds.user_id);

        let response = self.http.post(&url).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<serde_json::Value>()
                .await
                .ok()
                .and_then(|v| v["error"].as_str().map(String::from))
                .unwrap_or_else(|| status.to_string());
            return Err(match status.as_u16() {
                400 => Error::InvalidInput(message),
                401 => Error::Unauthorized,
                _ => Error::Request(message),
            });
        }
        Ok(response.json::<SyncResponse>().await?)
    }

    fn decrypt(&self, encrypted_data: &str) -> Result<TaskCollection> {
        let ciphertext = BASE64
            .decode(encrypted_data)
            .map_err(|e| Error::Crypto(format!("invalid ciphertext encoding: {e}")))?;
        let plaintext =
            open(&ciphertext, &self.creds.private_key).map_err(|e| Error::Crypto(e.to_string()))?;
        Ok(serde_json::from_slice(&plaintext)?)
    }
}

/// Change-detection fingerprint over the collection and tombstones.
fn fingerprint(collection: &TaskCollection, tombstones: &Tombstones) -> Result<String> {
    let mut hasher = Sha256::new();
    hasher.update(serde_json::to_vec(collection)?);

    // Hash tombstone ids in sorted order; HashSet iteration order is not
    // stable across runs.
    let mut task_ids: Vec<_> = tombstones.deleted_task_ids.iter().collect();
    task_ids.sort();
    let mut category_ids: Vec<_> = tombstones.deleted_category_ids.iter().collect();
    category_ids.sort();
    for id in task_ids.into_iter().chain(category_ids) {
        hasher.update(id.as_bytes());
    }

    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tasksync_core::Task;
    use uuid::Uuid;

    #[test]
    fn test_fingerprint_deterministic() {
        let collection = TaskCollection {
            tasks: vec![Task::new("a")],
            categories: vec![],
        };
        let tombstones = Tombstones::default();

        assert_eq!(
            fingerprint(&collection, &tombstones).unwrap(),
            fingerprint(&collection, &tombstones).unwrap()
        );
    }

    #[test]
    fn test_fingerprint_changes_with_content() {
        let a = TaskCollection {
            tasks: vec![Task::new("a")],
            categories: vec![],
        };
        let b = TaskCollection {
            tasks: vec![Task::new("b")],
            categories: vec![],
        };
        let tombstones = Tombstones::default();

        assert_ne!(
            fingerprint(&a, &tombstones).unwrap(),
            fingerprint(&b, &tombstones).unwrap()
        );
    }

    #[test]
    fn test_fingerprint_changes_with_tombstones() {
        let collection = TaskCollection::default();
        let empty = Tombstones::default();
        let with_deletion = Tombstones {
            deleted_task_ids: [Uuid::new_v4()].into(),
            deleted_category_ids: Default::default(),
        };

        assert_ne!(
            fingerprint(&collection, &empty).unwrap(),
            fingerprint(&collection, &with_deletion).unwrap()
        );
    }
}
