use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::cursor::StoreCursor;

#[derive(Debug, Error)]
pub enum CursorError {
    #[error("store cursor I/O failure: {0}")]
    Io(String),
}

/// The store-cursor registry (C5, §4.7).
///
/// All cursor mutations are expected to happen inside the same
/// transaction as the change they account for (§4.7, §5), so the cursor
/// never leads the actual data application; callers are responsible for
/// that ordering, this trait just persists whatever `save` is given.
#[async_trait]
pub trait CursorStore: Send + Sync {
    async fn get_or_create(&self, store_id: &str) -> Result<StoreCursor, CursorError>;

    async fn save(&self, cursor: StoreCursor) -> Result<(), CursorError>;
}

/// `tokio::sync::Mutex`-guarded in-memory [`CursorStore`].
#[derive(Clone, Default)]
pub struct InMemoryCursorStore {
    cursors: Arc<Mutex<HashMap<String, StoreCursor>>>,
}

impl InMemoryCursorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CursorStore for InMemoryCursorStore {
    async fn get_or_create(&self, store_id: &str) -> Result<StoreCursor, CursorError> {
        let mut cursors = self.cursors.lock().await;
        Ok(cursors
            .entry(store_id.to_string())
            .or_insert_with(|| StoreCursor::new(store_id))
            .clone())
    }

    async fn save(&self, cursor: StoreCursor) -> Result<(), CursorError> {
        let mut cursors = self.cursors.lock().await;
        cursors.insert(cursor.store_id.clone(), cursor);
        Ok(())
    }
}
