//! # tasksync-server
//!
//! Stateless-per-request HTTP handler for the two-phase sync protocol.
//! The server authenticates by public-key hash, auto-registers unknown
//! users, and stores only sealed ciphertext it cannot decrypt: the crypto
//! crate is linked seal-only here, so no decryption entry point is
//! reachable from network input.

pub mod error;
pub mod handlers;
pub mod state;

use axum::{routing::get, routing::post, Router};
use tower_http::trace::TraceLayer;

pub use error::ApiError;
pub use state::AppState;

/// Build the sync router over the given state.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/sync/:user_id", post(handlers::sync::sync))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
