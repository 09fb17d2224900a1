//! Storage trait for the durable sync store.
//!
//! The trait defines the interface concrete backends must satisfy,
//! enabling pluggable storage and testability.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Identity, StoredRecord};

/// Keyed storage of sync identities and their single ciphertext record.
///
/// Backends store one [`StoredRecord`] per identity, overwritten on every
/// write, with a uniqueness constraint on `public_key_hash`. There is no
/// read-then-write isolation across calls: two concurrent `put_record`
/// calls for the same identity race and the later write wins.
#[async_trait]
pub trait SyncStore: Send + Sync {
    /// Fetch an identity by user id.
    async fn identity(&self, user_id: &str) -> Result<Option<Identity>>;

    /// Create an identity at first successful sync (auto-registration).
    ///
    /// Fails if the user id or public key hash already exists.
    async fn create_identity(
        &self,
        user_id: &str,
        public_key: &[u8],
        public_key_hash: &str,
    ) -> Result<Identity>;

    /// Fetch the stored ciphertext record for an identity.
    async fn record(&self, user_id: &str) -> Result<Option<StoredRecord>>;

    /// Write or overwrite the ciphertext record, returning the new version.
    ///
    /// The version is the previous version plus 1, starting at 1 for the
    /// first write, and `updated_at` is refreshed.
    async fn put_record(&self, user_id: &str, ciphertext: &[u8]) -> Result<i64>;
}
