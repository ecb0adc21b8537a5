//! Ordered work item store

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{broadcast, RwLock};

use super::types::{ItemId, ItemPatch, ProcessingStats, StoreEvent, WorkItem, WorkflowStatus};

const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Single source of truth for submitted items.
///
/// Cloning yields another handle onto the same items. Every mutation is
/// applied under the write lock and is visible to the next reader; a
/// [`StoreEvent`] is broadcast afterwards for renderers.
#[derive(Clone)]
pub struct WorkItemStore {
    inner: Arc<WorkItemStoreInner>,
}

struct WorkItemStoreInner {
    items: RwLock<Vec<WorkItem>>,
    event_tx: broadcast::Sender<StoreEvent>,
}

impl WorkItemStore {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            inner: Arc::new(WorkItemStoreInner {
                items: RwLock::new(Vec::new()),
                event_tx,
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.inner.event_tx.subscribe()
    }

    fn emit(&self, event: StoreEvent) {
        let _ = self.inner.event_tx.send(event);
    }

    /// Append a batch, preserving submission order.
    pub async fn append(&self, new_items: Vec<WorkItem>) -> Vec<ItemId> {
        if new_items.is_empty() {
            return Vec::new();
        }

        let ids: Vec<ItemId> = new_items.iter().map(|i| i.id.clone()).collect();
        {
            let mut items = self.inner.items.write().await;
            items.extend(new_items);
        }

        tracing::debug!(target: "uniflow.store", added = ids.len(), "items appended");
        self.emit(StoreEvent::ItemsAdded { ids: ids.clone() });
        ids
    }

    /// Merge `patch` into the item with `id`. Returns `false` when the item no
    /// longer exists, in which case nothing happens.
    pub async fn update(&self, id: &ItemId, patch: ItemPatch) -> bool {
        let status = {
            let mut items = self.inner.items.write().await;
            let Some(item) = items.iter_mut().find(|i| &i.id == id) else {
                return false;
            };
            patch.apply(item);
            item.status
        };

        self.emit(StoreEvent::ItemUpdated {
            id: id.clone(),
            status,
            timestamp: Utc::now(),
        });
        true
    }

    /// Delete an item regardless of its state.
    pub async fn remove(&self, id: &ItemId) -> Option<WorkItem> {
        let removed = {
            let mut items = self.inner.items.write().await;
            let idx = items.iter().position(|i| &i.id == id)?;
            items.remove(idx)
        };

        self.emit(StoreEvent::ItemRemoved { id: id.clone() });
        Some(removed)
    }

    pub async fn get(&self, id: &ItemId) -> Option<WorkItem> {
        let items = self.inner.items.read().await;
        items.iter().find(|i| &i.id == id).cloned()
    }

    pub async fn status_of(&self, id: &ItemId) -> Option<WorkflowStatus> {
        let items = self.inner.items.read().await;
        items.iter().find(|i| &i.id == id).map(|i| i.status)
    }

    /// Lowest-index item currently `Pending`.
    pub async fn first_pending(&self) -> Option<WorkItem> {
        let items = self.inner.items.read().await;
        items
            .iter()
            .find(|i| i.status == WorkflowStatus::Pending)
            .cloned()
    }

    pub async fn snapshot(&self) -> Vec<WorkItem> {
        self.inner.items.read().await.clone()
    }

    pub async fn stats(&self) -> ProcessingStats {
        let items = self.inner.items.read().await;
        ProcessingStats::from_items(items.iter())
    }

    pub async fn len(&self) -> usize {
        self.inner.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.items.read().await.is_empty()
    }

    /// Items currently in `Analyzing` or `Generating`.
    pub async fn in_flight(&self) -> Vec<ItemId> {
        let items = self.inner.items.read().await;
        items
            .iter()
            .filter(|i| i.status.is_in_flight())
            .map(|i| i.id.clone())
            .collect()
    }
}

impl Default for WorkItemStore {
    fn default() -> Self {
        Self::new()
    }
}
