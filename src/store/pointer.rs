//! The single durable slot naming the task currently being visited.
//!
//! Its presence is the only authority for "tracking is active, and for which
//! task". The foreground lifecycle writes it; background firings read it. No
//! value is ever cached here: each `get` goes to the store.

use std::sync::Arc;

use log::debug;

use crate::error::StorageError;

use super::KeyValueStore;

pub const ACTIVE_TASK_KEY: &str = "activeTaskId";

#[derive(Clone)]
pub struct ActiveTaskPointer {
    store: Arc<dyn KeyValueStore>,
}

impl ActiveTaskPointer {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Overwrites any existing pointer. Last write wins.
    pub async fn set(&self, task_id: &str) -> Result<(), StorageError> {
        self.store.set(ACTIVE_TASK_KEY, task_id).await?;
        debug!("active task pointer set to {task_id}");
        Ok(())
    }

    pub async fn get(&self) -> Result<Option<String>, StorageError> {
        let value = self.store.get(ACTIVE_TASK_KEY).await?;
        Ok(value.filter(|id| !id.trim().is_empty()))
    }

    /// Idempotent.
    pub async fn clear(&self) -> Result<(), StorageError> {
        self.store.remove(ACTIVE_TASK_KEY).await?;
        debug!("active task pointer cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn pointer() -> (Arc<MemoryStore>, ActiveTaskPointer) {
        let store = Arc::new(MemoryStore::new());
        (store.clone(), ActiveTaskPointer::new(store))
    }

    #[tokio::test]
    async fn last_write_wins() {
        let (_, pointer) = pointer();
        pointer.set("A").await.unwrap();
        pointer.set("B").await.unwrap();
        assert_eq!(pointer.get().await.unwrap().as_deref(), Some("B"));
    }

    #[tokio::test]
    async fn clear_is_idempotent() {
        let (_, pointer) = pointer();
        pointer.clear().await.unwrap();
        pointer.set("A").await.unwrap();
        pointer.clear().await.unwrap();
        pointer.clear().await.unwrap();
        assert_eq!(pointer.get().await.unwrap(), None);
    }

    #[tokio::test]
    async fn blank_value_reads_as_absent() {
        let (store, pointer) = pointer();
        store.set(ACTIVE_TASK_KEY, "  ").await.unwrap();
        assert_eq!(pointer.get().await.unwrap(), None);
    }

    #[tokio::test]
    async fn reads_reflect_writes_made_elsewhere() {
        let (store, pointer) = pointer();
        assert_eq!(pointer.get().await.unwrap(), None);
        store.set(ACTIVE_TASK_KEY, "T5").await.unwrap();
        assert_eq!(pointer.get().await.unwrap().as_deref(), Some("T5"));
    }
}
