//! User-facing batch commands.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::config::{self, AppSettings};
use crate::context::Services;
use crate::error::BatchError;
use crate::events_out::EventLog;
use crate::kv::KeyValueStore;
use crate::scheduler::{BatchScheduler, RunOutcome, SchedulerOptions};
use crate::stage::SourceImage;
use crate::state::{
    ItemId, ItemPatch, ProcessingStats, StateTransition, StoreEvent, WorkItem, WorkItemStore,
};

/// Façade over the store, the scheduler and the settings record.
///
/// `start_run` holds the caller until the run ends; spawn it on a clone when
/// other commands must keep flowing meanwhile.
#[derive(Clone)]
pub struct BatchController {
    store: WorkItemStore,
    scheduler: BatchScheduler,
    settings: Arc<dyn KeyValueStore>,
    log: EventLog,
}

impl BatchController {
    pub fn new(services: Services, log: EventLog, opts: SchedulerOptions) -> Self {
        let store = WorkItemStore::new();
        let scheduler = BatchScheduler::new(
            store.clone(),
            services.vision,
            services.generation,
            log.clone(),
            opts,
        );
        Self {
            store,
            scheduler,
            settings: services.settings,
            log,
        }
    }

    pub fn store(&self) -> &WorkItemStore {
        &self.store
    }

    pub fn scheduler(&self) -> &BatchScheduler {
        &self.scheduler
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.store.subscribe()
    }

    /// Queue new images as `Pending` items, in the given order.
    pub async fn submit(&self, files: Vec<SourceImage>) -> Vec<ItemId> {
        let items: Vec<WorkItem> = files.into_iter().map(WorkItem::new).collect();
        let ids = self.store.append(items).await;
        if !ids.is_empty() {
            self.log.info(format!("Added {} images.", ids.len())).await;
        }
        ids
    }

    /// Start a run with the settings as currently saved.
    pub async fn start_run(&self) -> Result<RunOutcome, BatchError> {
        let settings = self.load_settings().await?;
        self.scheduler.start_run(&settings).await
    }

    pub async fn stop_run(&self) {
        if self.scheduler.is_running() {
            self.log.info("Stopping after the current item...").await;
        }
        self.scheduler.stop_run();
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    /// Put one failed item back in the queue.
    pub async fn retry(&self, id: &ItemId) -> Result<(), BatchError> {
        let item = self
            .store
            .get(id)
            .await
            .ok_or_else(|| BatchError::ItemNotFound(id.clone()))?;
        StateTransition::validate_retry(item.status)?;

        if !self.store.update(id, ItemPatch::retry()).await {
            return Err(BatchError::ItemNotFound(id.clone()));
        }
        self.log
            .info(format!("Retrying {}.", item.file_name()))
            .await;
        Ok(())
    }

    /// Delete an item in any state. Unknown ids are ignored.
    pub async fn remove(&self, id: &ItemId) -> bool {
        match self.store.remove(id).await {
            Some(item) => {
                tracing::debug!(
                    target: "uniflow.controller",
                    item = %id,
                    status = %item.status,
                    "item removed"
                );
                true
            }
            None => false,
        }
    }

    pub async fn stats(&self) -> ProcessingStats {
        self.store.stats().await
    }

    pub async fn items(&self) -> Vec<WorkItem> {
        self.store.snapshot().await
    }

    pub async fn get(&self, id: &ItemId) -> Option<WorkItem> {
        self.store.get(id).await
    }

    pub async fn load_settings(&self) -> Result<AppSettings, BatchError> {
        config::load_settings(self.settings.as_ref()).await
    }

    pub async fn save_settings(&self, settings: &AppSettings) -> Result<(), BatchError> {
        config::save_settings(self.settings.as_ref(), settings).await?;
        self.log.success("Settings saved.").await;
        Ok(())
    }
}
