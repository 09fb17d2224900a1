//! # tasksync-store
//!
//! Durable storage backends for tasksync. Both backends implement the
//! [`SyncStore`] trait from `tasksync-core`: [`SqliteStore`] persists to a
//! SQLite database via sqlx (including `sqlite::memory:` for tests), and
//! [`MemoryStore`] is a plain in-process map for unit and protocol tests.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

pub use tasksync_core::SyncStore;
