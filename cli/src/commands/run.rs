use std::path::{Path, PathBuf};

use serde_json::json;

use uniflow_core::api::{AppContext, RunOutcome, RunSummary, SourceImage, WorkItem};
use uniflow_plugins::download::DownloadReport;
use uniflow_plugins::factory;

use super::cli::RunArgs;
use crate::error::CliError;
use crate::progress::{status_line, ProgressMonitor};

pub async fn submit_and_run(args: RunArgs, ctx: &AppContext) -> Result<i32, CliError> {
    let controller = ctx.build_controller().await?;

    let sources = read_sources(&args.files).await?;
    let ids = controller.submit(sources).await;
    tracing::info!(target: "uniflow.cli", submitted = ids.len(), "files queued");

    let monitor = ProgressMonitor::spawn(&controller, ids.len() as u64, !args.no_progress);

    // Ctrl-C asks the run to stop after the current item.
    let stopper = tokio::spawn({
        let controller = controller.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                controller.stop_run().await;
            }
        }
    });

    let outcome = controller.start_run().await;
    stopper.abort();
    monitor.finish();

    if let Some(dropped) = ctx.events_out().map(|tx| tx.dropped_count()).filter(|n| *n > 0) {
        tracing::warn!(target: "uniflow.cli", dropped, "events_out channel full; lines dropped");
    }

    let summary = match outcome? {
        RunOutcome::Finished(summary) => summary,
        RunOutcome::AlreadyRunning => {
            return Err(CliError::Command("a batch run is already active".into()));
        }
    };

    let items = controller.items().await;
    let downloads = match &args.out {
        Some(out_dir) => {
            let downloader = factory::build_downloader(ctx.cfg(), controller.log().clone())?;
            Some(downloader.download_completed(&items, out_dir).await?)
        }
        None => None,
    };

    if args.json {
        print_json(&summary, &items, downloads.as_ref())?;
    } else {
        print_text(&summary, &items, downloads.as_ref(), args.out.as_deref());
    }

    Ok(if summary.failed > 0 { 1 } else { 0 })
}

async fn read_sources(files: &[PathBuf]) -> Result<Vec<SourceImage>, CliError> {
    let mut sources = Vec::with_capacity(files.len());
    for path in files {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            CliError::Io(std::io::Error::new(
                e.kind(),
                format!("read {}: {}", path.display(), e),
            ))
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        sources.push(SourceImage::new(name, bytes).with_preview(path.display().to_string()));
    }
    Ok(sources)
}

fn print_text(
    summary: &RunSummary,
    items: &[WorkItem],
    downloads: Option<&DownloadReport>,
    out_dir: Option<&Path>,
) {
    for item in items {
        let detail = match (&item.result_image, &item.last_error) {
            (Some(handle), _) => Some(handle.to_string()),
            (None, Some(err)) => Some(err.clone()),
            _ => None,
        };
        println!(
            "{}",
            status_line(item.file_name(), item.status, detail.as_deref())
        );
    }

    println!(
        "\n{} completed, {} failed, {} processed in {} ms{}",
        summary.completed,
        summary.failed,
        summary.processed,
        summary.duration_ms,
        if summary.stopped { " (stopped)" } else { "" }
    );

    if let (Some(report), Some(dir)) = (downloads, out_dir) {
        println!(
            "saved {} file(s) to {}, {} failed",
            report.saved.len(),
            dir.display(),
            report.failed.len()
        );
    }
}

fn print_json(
    summary: &RunSummary,
    items: &[WorkItem],
    downloads: Option<&DownloadReport>,
) -> Result<(), CliError> {
    let items: Vec<_> = items
        .iter()
        .map(|item| {
            json!({
                "id": item.id,
                "file": item.file_name(),
                "status": item.status,
                "prompt": item.derived_prompt,
                "result": item.result_image,
                "error": item.last_error,
            })
        })
        .collect();
    let doc = json!({
        "summary": summary,
        "items": items,
        "downloads": downloads,
    });
    let text = serde_json::to_string_pretty(&doc)
        .map_err(|e| CliError::Command(format!("encode summary failed: {e}")))?;
    println!("{}", text);
    Ok(())
}
