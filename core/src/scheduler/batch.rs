use std::sync::Arc;
use std::time::Instant;

use futures::StreamExt;

use super::run_state::{BatchRunState, StopSignal};
use super::types::{ItemOutcome, RunOutcome, RunSummary, SchedulerOptions};
use crate::config::AppSettings;
use crate::error::{BatchError, StageError};
use crate::events_out::{EventLog, LogLevel};
use crate::stage::{GenerationStage, Stage, VisionStage};
use crate::state::{ItemId, ItemPatch, StateTransition, WorkItem, WorkItemStore, WorkflowStatus};

/// Sequential two-stage batch worker.
///
/// Cloning shares the run state, so `stop_run` on any clone reaches a run
/// started from another.
#[derive(Clone)]
pub struct BatchScheduler {
    inner: Arc<SchedulerInner>,
}

struct SchedulerInner {
    store: WorkItemStore,
    vision: Arc<dyn VisionStage>,
    generation: Arc<dyn GenerationStage>,
    log: EventLog,
    run_state: BatchRunState,
    opts: SchedulerOptions,
}

/// Why an item left the pipeline early.
enum Interrupt {
    /// The item vanished from the store (user removal).
    Gone,
    Failed { stage: Stage, error: StageError },
}

impl BatchScheduler {
    pub fn new(
        store: WorkItemStore,
        vision: Arc<dyn VisionStage>,
        generation: Arc<dyn GenerationStage>,
        log: EventLog,
        opts: SchedulerOptions,
    ) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                store,
                vision,
                generation,
                log,
                run_state: BatchRunState::new(),
                opts,
            }),
        }
    }

    pub fn store(&self) -> &WorkItemStore {
        &self.inner.store
    }

    pub fn is_running(&self) -> bool {
        self.inner.run_state.is_running()
    }

    /// Item the active run currently owns.
    pub fn current_item(&self) -> Option<ItemId> {
        self.inner.run_state.current_item()
    }

    pub fn stop_signal(&self) -> StopSignal {
        self.inner.run_state.stop_signal()
    }

    /// Ask the active run to exit before its next claim. The in-flight item is
    /// left to finish.
    pub fn stop_run(&self) {
        if self.is_running() {
            tracing::info!(target: "uniflow.scheduler", "stop requested");
        }
        self.inner.run_state.stop_signal().raise();
    }

    /// Drive every `Pending` item through both stages, one at a time, until
    /// none remain or the stop signal is raised.
    pub async fn start_run(&self, settings: &AppSettings) -> Result<RunOutcome, BatchError> {
        let log = &self.inner.log;

        if let Err(err) = settings.validate() {
            log.error("Configuration missing! Set Base URLs & Keys.").await;
            return Err(err);
        }

        let Some(guard) = self.inner.run_state.try_begin() else {
            tracing::debug!(target: "uniflow.scheduler", "start_run ignored: run already active");
            return Ok(RunOutcome::AlreadyRunning);
        };

        let started = Instant::now();
        let stop = self.inner.run_state.stop_signal();
        let mut summary = RunSummary::default();

        log.info("Starting batch processing...").await;
        tracing::info!(
            target: "uniflow.scheduler",
            vision = self.inner.vision.name(),
            generation = self.inner.generation.name(),
            "run started"
        );

        loop {
            if stop.is_raised() {
                summary.stopped = true;
                break;
            }
            let Some(item) = self.inner.store.first_pending().await else {
                break;
            };

            guard.claim(item.id.clone());
            let outcome = self.process_item(item, settings).await;
            summary.record(outcome);
            guard.release();

            tokio::time::sleep(self.inner.opts.inter_item_pause).await;
        }

        summary.duration_ms = started.elapsed().as_millis() as u64;
        drop(guard);

        if summary.stopped {
            log.warning("Batch stopped by user.").await;
        }
        log.log(
            LogLevel::Success,
            format!(
                "Batch run finished: {} completed, {} failed.",
                summary.completed, summary.failed
            ),
            serde_json::to_value(&summary).ok(),
        )
        .await;
        tracing::info!(
            target: "uniflow.scheduler",
            processed = summary.processed,
            completed = summary.completed,
            failed = summary.failed,
            abandoned = summary.abandoned,
            stopped = summary.stopped,
            duration_ms = summary.duration_ms,
            "run finished"
        );

        Ok(RunOutcome::Finished(summary))
    }

    async fn process_item(&self, item: WorkItem, settings: &AppSettings) -> ItemOutcome {
        let file = item.file_name().to_string();
        tracing::debug!(target: "uniflow.scheduler", item = %item.id, file = %file, "item claimed");

        match self.run_pipeline(&item, settings).await {
            Ok(()) => ItemOutcome::Completed,
            Err(Interrupt::Gone) => self.abandon(&file).await,
            Err(Interrupt::Failed { stage, error }) => {
                let message = BatchError::from_stage(stage, error).item_message();
                let from = self
                    .inner
                    .store
                    .status_of(&item.id)
                    .await
                    .unwrap_or(WorkflowStatus::Analyzing);
                if !self
                    .transition(&item.id, from, ItemPatch::failed(message.clone()))
                    .await
                {
                    return self.abandon(&file).await;
                }
                self.inner
                    .log
                    .error(format!("Failed {}: {}", file, message))
                    .await;
                ItemOutcome::Failed
            }
        }
    }

    async fn abandon(&self, file: &str) -> ItemOutcome {
        self.inner
            .log
            .warning(format!("{} was removed while processing; skipped.", file))
            .await;
        ItemOutcome::Abandoned
    }

    async fn run_pipeline(&self, item: &WorkItem, settings: &AppSettings) -> Result<(), Interrupt> {
        let id = &item.id;

        if !self
            .transition(id, WorkflowStatus::Pending, ItemPatch::analyzing())
            .await
        {
            return Err(Interrupt::Gone);
        }

        let prompt = self.analyze(item, settings).await?;

        if !self
            .transition(
                id,
                WorkflowStatus::Analyzing,
                ItemPatch::generating(prompt.clone()),
            )
            .await
        {
            return Err(Interrupt::Gone);
        }

        let handle = self
            .inner
            .generation
            .generate_image(&item.source, &prompt, &settings.generation_config)
            .await
            .map_err(|error| Interrupt::Failed {
                stage: Stage::Generation,
                error,
            })?;

        if !self
            .transition(id, WorkflowStatus::Generating, ItemPatch::completed(handle))
            .await
        {
            return Err(Interrupt::Gone);
        }

        tracing::info!(target: "uniflow.scheduler", item = %id, file = %item.file_name(), "item completed");
        Ok(())
    }

    /// Consume the vision stream, writing each prefix to the item as it
    /// arrives. Returns the final prefix.
    async fn analyze(&self, item: &WorkItem, settings: &AppSettings) -> Result<String, Interrupt> {
        let failed = |error: StageError| Interrupt::Failed {
            stage: Stage::Analysis,
            error,
        };

        let mut stream = self
            .inner
            .vision
            .describe_image(&item.source, &settings.analysis_config)
            .await
            .map_err(failed)?;

        let mut prompt = String::new();
        while let Some(next) = stream.next().await {
            prompt = next.map_err(failed)?;
            let patch = ItemPatch::default().with_prompt(prompt.clone());
            if !self.inner.store.update(&item.id, patch).await {
                return Err(Interrupt::Gone);
            }
        }

        Ok(prompt)
    }

    /// Validate `from -> patch.status` and write the patch. `false` means the
    /// item is gone or the change is not a legal transition.
    async fn transition(&self, id: &ItemId, from: WorkflowStatus, patch: ItemPatch) -> bool {
        if let Some(to) = patch.status {
            if let Err(err) = StateTransition::validate(from, to) {
                tracing::error!(target: "uniflow.scheduler", item = %id, "{}", err);
                return false;
            }
        }
        self.inner.store.update(id, patch).await
    }
}
