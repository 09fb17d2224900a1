//! Data model for the synchronized task/category collection.
//!
//! Every synchronizable entity carries a stable [`Uuid`] identity, an
//! optional small `numeric_id` assigned client-side from a bounded counter
//! (1..=65535), and a `last_save` timestamp used by the merge engine. The
//! `numeric_id` is the preferred merge key when present because it is cheap
//! to compare; the `id` is always the fallback and the two must never
//! diverge for the same logical entity.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Upper bound of the client-side numeric id counter.
pub const MAX_NUMERIC_ID: u16 = u16::MAX;

/// A single task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Durable cross-device identity. Never reused.
    pub id: Uuid,
    /// Client-assigned small id (1..=65535), preferred merge key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numeric_id: Option<u16>,
    /// The task text.
    pub text: String,
    /// Completion flag.
    #[serde(default)]
    pub done: bool,
    /// Owning category, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Uuid>,
    /// Last time this entity was serialized for sync. Missing is treated
    /// as epoch 0 by the merge engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_save: Option<DateTime<Utc>>,
}

impl Task {
    /// Create a new task with a fresh id and no sync stamp.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            numeric_id: None,
            text: text.into(),
            done: false,
            category_id: None,
            last_save: None,
        }
    }
}

/// A task category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    /// Durable cross-device identity. Never reused.
    pub id: Uuid,
    /// Client-assigned small id (1..=65535), preferred merge key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numeric_id: Option<u16>,
    /// Display name.
    pub name: String,
    /// Display color, if the user picked one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Last time this entity was serialized for sync.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_save: Option<DateTime<Utc>>,
}

impl Category {
    /// Create a new category with a fresh id and no sync stamp.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            numeric_id: None,
            name: name.into(),
            color: None,
            last_save: None,
        }
    }
}

/// The unit of synchronization: the full working copy of one user's data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCollection {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub categories: Vec<Category>,
}

impl TaskCollection {
    /// True if the collection holds no entities at all.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty() && self.categories.is_empty()
    }

    /// Stamp every entity's `last_save` to the given instant.
    ///
    /// The sync controller calls this on every sync attempt, not only for
    /// genuinely modified entities. Inherited behavior: it can mask true
    /// edit order across devices and is kept as-is.
    pub fn stamp_all(&mut self, now: DateTime<Utc>) {
        for task in &mut self.tasks {
            task.last_save = Some(now);
        }
        for category in &mut self.categories {
            category.last_save = Some(now);
        }
    }
}

/// Ids the local replica has deleted, per entity kind.
///
/// An id enters a tombstone set the moment local deletion occurs and is
/// consulted, never mutated, during merge. Without these, a union-based
/// merge would resurrect a remotely-unmodified copy of a locally deleted
/// item. The sets are never pruned here (documented limitation).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tombstones {
    #[serde(default)]
    pub deleted_task_ids: HashSet<Uuid>,
    #[serde(default)]
    pub deleted_category_ids: HashSet<Uuid>,
}

impl Tombstones {
    /// True if neither set contains any id.
    pub fn is_empty(&self) -> bool {
        self.deleted_task_ids.is_empty() && self.deleted_category_ids.is_empty()
    }
}

/// A registered sync identity.
///
/// Created once at first successful sync (auto-registration) and immutable
/// afterwards. A credential mismatch on subsequent syncs is rejected, never
/// updated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Client-chosen handle: lowercase ASCII alphanumeric, at least 8 chars.
    pub user_id: String,
    /// Hex SHA-256 of `public_key`. Unique across identities.
    pub public_key_hash: String,
    /// Raw X25519 public key bytes.
    pub public_key: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

/// The single stored ciphertext record for one identity.
///
/// Overwritten on every server-side write; no history is retained.
/// `version` increments by exactly 1 per write. It is a write counter for
/// observability, not a vector clock, and the server performs no
/// optimistic-concurrency rejection against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    pub user_id: String,
    pub ciphertext: Option<Vec<u8>>,
    pub version: i64,
    pub updated_at: DateTime<Utc>,
}

/// Next value of the bounded client-side numeric id counter.
///
/// Returns `None` once the range is exhausted; callers then fall back to
/// uuid-only entities (the merge engine keys on `id` in that case).
pub fn next_numeric_id(existing: impl IntoIterator<Item = u16>) -> Option<u16> {
    let max = existing.into_iter().max().unwrap_or(0);
    if max >= MAX_NUMERIC_ID {
        None
    } else {
        Some(max + 1)
    }
}

/// Validate a client-chosen user id against the handle policy.
pub fn validate_user_id(user_id: &str) -> Result<(), crate::Error> {
    if user_id.len() < 8 {
        return Err(crate::Error::InvalidInput(
            "userId must be at least 8 characters".to_string(),
        ));
    }
    if !user_id
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
    {
        return Err(crate::Error::InvalidInput(
            "userId must be lowercase alphanumeric".to_string(),
        ));
    }
    Ok(())
}
