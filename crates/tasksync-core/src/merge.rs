//! Deterministic reconciliation of two versions of an entity collection.
//!
//! The same algorithm runs once for tasks and once for categories,
//! parameterized only by the entity type via [`Mergeable`]. It is pure,
//! synchronous computation: no I/O, no clocks, no randomness.
//!
//! Algorithm:
//!
//! 1. Build a map keyed by `numeric_id` when present, else `id`, seeded
//!    with every local entity.
//! 2. For each remote entity: if no local entity shares its key, include it
//!    unless its `id` is tombstoned (a remote-only entity the local replica
//!    already deleted must not be resurrected). If a local entity shares
//!    the key, the strictly newer `last_save` wins; ties keep the local
//!    entity (deliberate local-wins tie-break).
//! 3. Drop every entity whose `id` is tombstoned. This second pass is what
//!    removes a still-present remote copy of a locally deleted entity even
//!    when the local list already excludes it.
//!
//! The result is idempotent (`merge(X, X, t) == X` modulo order) and
//! tombstones strictly dominate content from either side. It is not
//! commutative in one corner case: equal timestamps with no tombstone keep
//! whichever side is "local".

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{Category, Task, TaskCollection, Tombstones};

/// An entity the merge engine can reconcile.
pub trait Mergeable: Clone {
    /// Durable cross-device identity.
    fn id(&self) -> Uuid;
    /// Cheap client-assigned merge key, when present.
    fn numeric_id(&self) -> Option<u16>;
    /// Timestamp compared during conflicts. Missing is treated as epoch 0.
    fn last_save(&self) -> Option<DateTime<Utc>>;
}

impl Mergeable for Task {
    fn id(&self) -> Uuid {
        self.id
    }
    fn numeric_id(&self) -> Option<u16> {
        self.numeric_id
    }
    fn last_save(&self) -> Option<DateTime<Utc>> {
        self.last_save
    }
}

impl Mergeable for Category {
    fn id(&self) -> Uuid {
        self.id
    }
    fn numeric_id(&self) -> Option<u16> {
        self.numeric_id
    }
    fn last_save(&self) -> Option<DateTime<Utc>> {
        self.last_save
    }
}

/// Map key: `numeric_id` when assigned, `id` otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum MergeKey {
    Numeric(u16),
    Id(Uuid),
}

fn key_of<E: Mergeable>(entity: &E) -> MergeKey {
    match entity.numeric_id() {
        Some(n) => MergeKey::Numeric(n),
        None => MergeKey::Id(entity.id()),
    }
}

fn stamp_of<E: Mergeable>(entity: &E) -> DateTime<Utc> {
    entity.last_save().unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Merge two versions of one entity list under a tombstone set.
///
/// Output order is deterministic: local entities first in their original
/// order, then remote-only entities in theirs.
pub fn merge<E: Mergeable>(local: &[E], remote: &[E], tombstones: &HashSet<Uuid>) -> Vec<E> {
    let mut order: Vec<MergeKey> = Vec::with_capacity(local.len() + remote.len());
    let mut by_key: HashMap<MergeKey, E> = HashMap::with_capacity(local.len() + remote.len());

    for entity in local {
        let key = key_of(entity);
        if by_key.insert(key, entity.clone()).is_none() {
            order.push(key);
        }
    }

    for entity in remote {
        let key = key_of(entity);
        match by_key.get(&key) {
            None => {
                if !tombstones.contains(&entity.id()) {
                    by_key.insert(key, entity.clone());
                    order.push(key);
                }
            }
            Some(existing) => {
                // Strictly greater replaces; a tie keeps the local entity.
                if stamp_of(entity) > stamp_of(existing) {
                    by_key.insert(key, entity.clone());
                }
            }
        }
    }

    order
        .into_iter()
        .filter_map(|key| by_key.remove(&key))
        .filter(|entity| !tombstones.contains(&entity.id()))
        .collect()
}

/// Merge both entity lists of a [`TaskCollection`] in one call.
pub fn merge_collections(
    local: &TaskCollection,
    remote: &TaskCollection,
    tombstones: &Tombstones,
) -> TaskCollection {
    TaskCollection {
        tasks: merge(&local.tasks, &remote.tasks, &tombstones.deleted_task_ids),
        categories: merge(
            &local.categories,
            &remote.categories,
            &tombstones.deleted_category_ids,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn task_at(text: &str, numeric_id: Option<u16>, secs: i64) -> Task {
        Task {
            id: Uuid::new_v4(),
            numeric_id,
            text: text.to_string(),
            done: false,
            category_id: None,
            last_save: Some(Utc.timestamp_opt(secs, 0).unwrap()),
        }
    }

    fn ids(tasks: &[Task]) -> HashSet<Uuid> {
        tasks.iter().map(|t| t.id).collect()
    }

    #[test]
    fn test_union_of_disjoint_sides() {
        let local = vec![task_at("local", Some(1), 100)];
        let remote = vec![task_at("remote", Some(2), 100)];

        let merged = merge(&local, &remote, &HashSet::new());
        assert_eq!(merged.len(), 2);
        assert!(ids(&merged).contains(&local[0].id));
        assert!(ids(&merged).contains(&remote[0].id));
    }

    #[test]
    fn test_idempotence() {
        let collection = vec![
            task_at("a", Some(1), 100),
            task_at("b", Some(2), 200),
            task_at("c", None, 300),
        ];

        let merged = merge(&collection, &collection, &HashSet::new());
        assert_eq!(merged, collection);
    }

    #[test]
    fn test_newer_remote_wins() {
        let mut local = task_at("old text", Some(1), 100);
        let mut remote = local.clone();
        remote.text = "new text".to_string();
        remote.last_save = Some(Utc.timestamp_opt(200, 0).unwrap());
        local.last_save = Some(Utc.timestamp_opt(100, 0).unwrap());

        let merged = merge(&[local], &[remote], &HashSet::new());
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].text, "new text");
    }

    #[test]
    fn test_newer_local_wins() {
        let local = task_at("kept", Some(1), 300);
        let mut remote = local.clone();
        remote.text = "stale".to_string();
        remote.last_save = Some(Utc.timestamp_opt(100, 0).unwrap());

        let merged = merge(&[local.clone()], &[remote], &HashSet::new());
        assert_eq!(merged, vec![local]);
    }

    #[test]
    fn test_equal_timestamps_keep_local() {
        let local = task_at("local variant", Some(1), 100);
        let mut remote = local.clone();
        remote.text = "remote variant".to_string();

        let merged = merge(&[local], &[remote], &HashSet::new());
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].text, "local variant");
    }

    #[test]
    fn test_missing_last_save_loses_to_any_stamp() {
        let mut local = task_at("unstamped", Some(1), 0);
        local.last_save = None;
        let mut remote = local.clone();
        remote.text = "stamped".to_string();
        remote.last_save = Some(Utc.timestamp_opt(1, 0).unwrap());

        let merged = merge(&[local], &[remote], &HashSet::new());
        assert_eq!(merged[0].text, "stamped");
    }

    #[test]
    fn test_tombstone_blocks_remote_resurrection() {
        let deleted = task_at("deleted locally", Some(5), 100);
        let tombstones: HashSet<Uuid> = [deleted.id].into();

        // Local side has already removed the entity from its list.
        let merged = merge(&[], &[deleted], &tombstones);
        assert!(merged.is_empty());
    }

    #[test]
    fn test_tombstone_removes_local_entity_too() {
        // A stale local list may still carry a deleted entity; the final
        // filter drops it regardless of which side it came from.
        let deleted = task_at("deleted", Some(5), 100);
        let kept = task_at("kept", Some(6), 100);
        let tombstones: HashSet<Uuid> = [deleted.id].into();

        let merged = merge(&[deleted, kept.clone()], &[], &tombstones);
        assert_eq!(merged, vec![kept]);
    }

    #[test]
    fn test_tombstone_dominates_newer_timestamp() {
        let deleted = task_at("deleted", Some(5), 9_999_999);
        let tombstones: HashSet<Uuid> = [deleted.id].into();

        let merged = merge(&[deleted.clone()], &[deleted], &tombstones);
        assert!(merged.is_empty());
    }

    #[test]
    fn test_uuid_fallback_key_matches_same_entity() {
        // Entities without numeric ids still reconcile through their uuid.
        let local = task_at("a", None, 100);
        let mut remote = local.clone();
        remote.text = "a, edited remotely".to_string();
        remote.last_save = Some(Utc.timestamp_opt(200, 0).unwrap());

        let merged = merge(&[local], &[remote], &HashSet::new());
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].text, "a, edited remotely");
    }

    #[test]
    fn test_output_order_local_then_remote() {
        let local = vec![task_at("l1", Some(1), 10), task_at("l2", Some(2), 10)];
        let remote = vec![task_at("r1", Some(3), 10), task_at("r2", Some(4), 10)];

        let merged = merge(&local, &remote, &HashSet::new());
        let texts: Vec<&str> = merged.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["l1", "l2", "r1", "r2"]);
    }

    #[test]
    fn test_merge_collections_applies_both_tombstone_sets() {
        let task = task_at("gone", Some(1), 100);
        let category = Category {
            id: Uuid::new_v4(),
            numeric_id: Some(1),
            name: "gone too".to_string(),
            color: None,
            last_save: None,
        };
        let remote = TaskCollection {
            tasks: vec![task.clone()],
            categories: vec![category.clone()],
        };
        let tombstones = Tombstones {
            deleted_task_ids: [task.id].into(),
            deleted_category_ids: [category.id].into(),
        };

        let merged = merge_collections(&TaskCollection::default(), &remote, &tombstones);
        assert!(merged.is_empty());
    }

    #[test]
    fn test_categories_merge_like_tasks() {
        let local = Category {
            id: Uuid::new_v4(),
            numeric_id: Some(1),
            name: "home".to_string(),
            color: Some("#aabbcc".to_string()),
            last_save: Some(Utc.timestamp_opt(100, 0).unwrap()),
        };
        let mut remote = local.clone();
        remote.name = "household".to_string();
        remote.last_save = Some(Utc.timestamp_opt(200, 0).unwrap());

        let merged = merge(&[local], &[remote], &HashSet::new());
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].name, "household");
    }
}
