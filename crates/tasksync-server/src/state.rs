//! Shared application state with lazy store initialization.

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{info, warn};

use tasksync_core::{Result, SyncStore};
use tasksync_store::SqliteStore;

/// Application state shared across handlers.
///
/// The durable store connection is established lazily on first use.
/// Concurrent cold-start requests await the same initialization attempt
/// rather than racing duplicate schema setups; if the attempt fails, the
/// error propagates to every waiter and the cell stays empty so the next
/// request retries cleanly.
#[derive(Clone)]
pub struct AppState {
    database_url: String,
    store: Arc<OnceCell<Arc<dyn SyncStore>>>,
}

impl AppState {
    /// State that connects to `database_url` on first request.
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            store: Arc::new(OnceCell::new()),
        }
    }

    /// State over an already-constructed store (tests, embedding).
    pub fn with_store(store: Arc<dyn SyncStore>) -> Self {
        Self {
            database_url: String::new(),
            store: Arc::new(OnceCell::new_with(Some(store))),
        }
    }

    /// Access the store, initializing it on first call.
    pub async fn store(&self) -> Result<&Arc<dyn SyncStore>> {
        self.store
            .get_or_try_init(|| async {
                info!(url = %self.database_url, "initializing durable store");
                match SqliteStore::connect(&self.database_url).await {
                    Ok(store) => Ok(Arc::new(store) as Arc<dyn SyncStore>),
                    Err(e) => {
                        warn!(error = %e, "store initialization failed");
                        Err(e)
                    }
                }
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lazy_init_failure_then_retry() {
        // An unopenable path fails initialization but does not poison the
        // cell; the call is retried on the next access.
        let state = AppState::new("sqlite:/nonexistent-dir/no/such/path.db");
        assert!(state.store().await.is_err());
        assert!(state.store().await.is_err());
    }

    #[tokio::test]
    async fn test_concurrent_first_access_converges() {
        let state = AppState::new("sqlite::memory:");

        let (a, b) = tokio::join!(state.store(), state.store());
        let a = a.unwrap();
        let b = b.unwrap();
        assert!(Arc::ptr_eq(a, b));
    }

    #[tokio::test]
    async fn test_with_store_is_preinitialized() {
        let store = Arc::new(tasksync_store::MemoryStore::new());
        let state = AppState::with_store(store);
        assert!(state.store().await.is_ok());
    }
}
