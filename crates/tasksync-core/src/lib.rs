//! # tasksync-core
//!
//! Core types, traits, and the merge engine for the tasksync workspace.
//!
//! This crate provides the foundational data structures the other tasksync
//! crates depend on: the task/category data model, the wire protocol types
//! for the two-phase sync exchange, the deterministic entity merge engine,
//! and the `SyncStore` trait implemented by the durable storage backends.

pub mod error;
pub mod merge;
pub mod models;
pub mod protocol;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use merge::{merge, merge_collections, Mergeable};
pub use models::{
    next_numeric_id, validate_user_id, Category, Identity, StoredRecord, Task, TaskCollection,
    Tombstones,
};
pub use protocol::{SyncRequest, SyncResponse};
pub use traits::SyncStore;
