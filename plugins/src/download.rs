//! Saving finished results to disk.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Serialize;

use uniflow_core::api::{EventLog, ImageHandle, WorkItem, WorkflowStatus};
use uniflow_core::config::defaults::DEFAULT_INTER_ITEM_PAUSE_MS;

use crate::stage::build_client;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DownloadReport {
    pub saved: Vec<PathBuf>,
    /// `(file name, reason)` per item that could not be written.
    pub failed: Vec<(String, String)>,
}

pub struct Downloader {
    http: reqwest::Client,
    log: EventLog,
    pause: Duration,
}

impl Downloader {
    pub fn new(timeout_ms: u64, log: EventLog) -> anyhow::Result<Self> {
        Ok(Self {
            http: build_client(timeout_ms)?,
            log,
            pause: Duration::from_millis(DEFAULT_INTER_ITEM_PAUSE_MS),
        })
    }

    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    /// Write every `Completed` item's result to `out_dir` as
    /// `processed-<file name>`, one at a time. Same-named items get a
    /// ` (n)` suffix. A failed item is logged and skipped.
    pub async fn download_completed(
        &self,
        items: &[WorkItem],
        out_dir: &Path,
    ) -> anyhow::Result<DownloadReport> {
        let completed: Vec<(&WorkItem, &ImageHandle)> = items
            .iter()
            .filter(|i| i.status == WorkflowStatus::Completed)
            .filter_map(|i| i.result_image.as_ref().map(|h| (i, h)))
            .collect();

        let mut report = DownloadReport::default();
        if completed.is_empty() {
            return Ok(report);
        }

        tokio::fs::create_dir_all(out_dir)
            .await
            .with_context(|| format!("create {}", out_dir.display()))?;
        self.log
            .info(format!(
                "Starting batch download for {} items...",
                completed.len()
            ))
            .await;

        let mut taken = HashSet::new();
        for (idx, (item, handle)) in completed.iter().enumerate() {
            if idx > 0 {
                tokio::time::sleep(self.pause).await;
            }

            let target = out_dir.join(claim_name(&mut taken, output_name(item.file_name())));
            match self.save(handle, &target).await {
                Ok(()) => {
                    tracing::debug!(target: "uniflow.download", path = %target.display(), "saved");
                    report.saved.push(target);
                }
                Err(err) => {
                    let reason = format!("{:#}", err);
                    self.log
                        .warning(format!("Download failed for {}: {}", item.file_name(), reason))
                        .await;
                    report.failed.push((item.file_name().to_string(), reason));
                }
            }
        }

        self.log.success("Batch download complete.").await;
        Ok(report)
    }

    async fn save(&self, handle: &ImageHandle, target: &Path) -> anyhow::Result<()> {
        let bytes = match handle {
            ImageHandle::Url(url) => {
                let resp = self
                    .http
                    .get(url)
                    .send()
                    .await
                    .with_context(|| format!("fetch {}", url))?;
                let status = resp.status();
                if !status.is_success() {
                    anyhow::bail!("fetch {} returned {}", url, status);
                }
                resp.bytes().await?.to_vec()
            }
            ImageHandle::Inline { .. } => match handle.decode_inline() {
                Some(decoded) => decoded.context("decode inline image")?,
                None => anyhow::bail!("inline handle without payload"),
            },
        };

        tokio::fs::write(target, bytes)
            .await
            .with_context(|| format!("write {}", target.display()))
    }
}

fn output_name(file_name: &str) -> String {
    let base = Path::new(file_name)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "image.png".to_string());
    format!("processed-{}", base)
}

/// First of `name`, `stem (1).ext`, `stem (2).ext`, ... not yet in `taken`.
fn claim_name(taken: &mut HashSet<String>, name: String) -> String {
    if taken.insert(name.clone()) {
        return name;
    }
    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem.to_string(), format!(".{}", ext)),
        _ => (name.clone(), String::new()),
    };
    let mut n = 1;
    loop {
        let candidate = format!("{} ({}){}", stem, n, ext);
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}
