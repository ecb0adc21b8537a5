//! Terminal progress driven by store broadcasts. Event-log lines reach the
//! terminal through the tracing console layer.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use uniflow_core::api::{BatchController, StateTransition, StoreEvent, WorkflowStatus};

pub struct ProgressMonitor {
    bar: ProgressBar,
    task: JoinHandle<()>,
}

impl ProgressMonitor {
    pub fn spawn(controller: &BatchController, total: u64, visible: bool) -> Self {
        let bar = if visible && atty::is(atty::Stream::Stderr) {
            ProgressBar::with_draw_target(Some(total), ProgressDrawTarget::stderr())
        } else {
            ProgressBar::hidden()
        };
        bar.set_style(
            ProgressStyle::with_template("{spinner} [{elapsed_precise}] {bar:30} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar.enable_steady_tick(Duration::from_millis(120));

        let mut store_rx = controller.subscribe();
        let store = controller.store().clone();
        let store_bar = bar.clone();
        let task = tokio::spawn(async move {
            loop {
                match store_rx.recv().await {
                    Ok(StoreEvent::ItemUpdated { id, status, .. }) => {
                        if StateTransition::is_terminal(status) {
                            store_bar.inc(1);
                        }
                        let name = store
                            .get(&id)
                            .await
                            .map(|i| i.file_name().to_string())
                            .unwrap_or_else(|| id.to_string());
                        store_bar.set_message(format!(
                            "{}: {}",
                            name,
                            StateTransition::status_description(status)
                        ));
                    }
                    Ok(StoreEvent::ItemsAdded { ids }) => {
                        store_bar.inc_length(ids.len() as u64);
                    }
                    Ok(StoreEvent::ItemRemoved { .. }) => {}
                    Err(RecvError::Lagged(n)) => {
                        tracing::debug!(target: "uniflow.cli", skipped = n, "progress lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        Self { bar, task }
    }

    pub fn finish(self) {
        self.task.abort();
        self.bar.finish_and_clear();
    }
}

/// One line per item for the final report.
pub fn status_line(name: &str, status: WorkflowStatus, detail: Option<&str>) -> String {
    match detail {
        Some(detail) if !detail.is_empty() => format!("{:<10} {}  {}", status.as_str(), name, detail),
        _ => format!("{:<10} {}", status.as_str(), name),
    }
}
