//! # tasksync-client
//!
//! Client-side orchestration of the two-phase sync protocol. The
//! [`SyncController`] owns all mutable session state (busy flag, debounce
//! generation, change fingerprint), runs at most one session at a time,
//! and never commits partial results: a session either returns the full
//! converged collection or leaves the caller's state untouched.

pub mod session;

pub use session::{SkipReason, SyncController, SyncOutcome};

pub use tasksync_crypto::SyncCredentials;
