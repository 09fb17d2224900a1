//! In-memory store backend.
//!
//! Backs the server and client test suites; data lives only as long as the
//! process. Semantics match [`crate::SqliteStore`] exactly, including the
//! uniqueness constraint on `public_key_hash` and the version counter.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use tasksync_core::{Error, Identity, Result, StoredRecord, SyncStore};

#[derive(Default)]
struct Inner {
    identities: HashMap<String, Identity>,
    records: HashMap<String, StoredRecord>,
}

/// Map-backed [`SyncStore`] implementation.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SyncStore for MemoryStore {
    async fn identity(&self, user_id: &str) -> Result<Option<Identity>> {
        let inner = self.inner.read().expect("store lock poisoned");
        Ok(inner.identities.get(user_id).cloned())
    }

    async fn create_identity(
        &self,
        user_id: &str,
        public_key: &[u8],
        public_key_hash: &str,
    ) -> Result<Identity> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        if inner.identities.contains_key(user_id) {
            return Err(Error::Internal(format!(
                "identity already exists: {user_id}"
            )));
        }
        if inner
            .identities
            .values()
            .any(|i| i.public_key_hash == public_key_hash)
        {
            return Err(Error::Internal(
                "public key hash already registered".to_string(),
            ));
        }

        let identity = Identity {
            user_id: user_id.to_string(),
            public_key_hash: public_key_hash.to_string(),
            public_key: public_key.to_vec(),
            created_at: Utc::now(),
        };
        inner
            .identities
            .insert(user_id.to_string(), identity.clone());
        Ok(identity)
    }

    async fn record(&self, user_id: &str) -> Result<Option<StoredRecord>> {
        let inner = self.inner.read().expect("store lock poisoned");
        Ok(inner.records.get(user_id).cloned())
    }

    async fn put_record(&self, user_id: &str, ciphertext: &[u8]) -> Result<i64> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        let record = inner
            .records
            .entry(user_id.to_string())
            .or_insert_with(|| StoredRecord {
                user_id: user_id.to_string(),
                ciphertext: None,
                version: 0,
                updated_at: Utc::now(),
            });
        record.ciphertext = Some(ciphertext.to_vec());
        record.version += 1;
        record.updated_at = Utc::now();
        Ok(record.version)
    }
}
