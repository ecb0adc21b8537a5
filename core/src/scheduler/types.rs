use std::time::Duration;

use serde::Serialize;

use crate::config::{defaults::DEFAULT_INTER_ITEM_PAUSE_MS, SchedulerConfig};

#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    /// Pause between items before the next scan.
    pub inter_item_pause: Duration,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            inter_item_pause: Duration::from_millis(DEFAULT_INTER_ITEM_PAUSE_MS),
        }
    }
}

impl From<&SchedulerConfig> for SchedulerOptions {
    fn from(cfg: &SchedulerConfig) -> Self {
        Self {
            inter_item_pause: Duration::from_millis(cfg.inter_item_pause_ms),
        }
    }
}

/// Result of a `start_run` call that passed the configuration check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Another run was active; nothing was done.
    AlreadyRunning,
    Finished(RunSummary),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Items claimed during this run.
    pub processed: usize,
    pub completed: usize,
    pub failed: usize,
    /// Items removed by the user while the run owned them.
    pub abandoned: usize,
    /// The loop exited because the stop signal was raised.
    pub stopped: bool,
    pub duration_ms: u64,
}

/// How one claimed item left the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    Completed,
    Failed,
    Abandoned,
}

impl RunSummary {
    pub(crate) fn record(&mut self, outcome: ItemOutcome) {
        self.processed += 1;
        match outcome {
            ItemOutcome::Completed => self.completed += 1,
            ItemOutcome::Failed => self.failed += 1,
            ItemOutcome::Abandoned => self.abandoned += 1,
        }
    }
}
