use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
mod commands;
mod error;
mod progress;
use commands::cli;
use error::CliError;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use uniflow_core::api::AppContext;
use uniflow_core::config::{get_uniflow_data_dir, LoggingConfig};
use uniflow_plugins::services::PluginServicesFactory;

static LOG_GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
    std::sync::OnceLock::new();

#[tokio::main]
async fn main() {
    let exit = match real_main().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{e}");
            e.exit_code()
        }
    };

    std::process::exit(exit);
}

async fn real_main() -> Result<i32, CliError> {
    let args = cli::Args::parse();
    let cfg = uniflow_core::config::load_default().map_err(|e| CliError::Config(e.to_string()))?;
    init_tracing(&cfg.logging).map_err(CliError::Command)?;

    let ctx = AppContext::new(cfg, Some(Arc::new(PluginServicesFactory))).await?;

    match args.command {
        cli::Commands::SubmitAndRun(run_args) => {
            commands::run::submit_and_run(run_args, &ctx).await
        }
        cli::Commands::Settings(settings_args) => {
            commands::settings::settings_cmd(settings_args, &ctx).await
        }
    }
}

fn init_tracing(logging: &LoggingConfig) -> Result<(), String> {
    if !logging.enabled {
        return Ok(());
    }

    let filter = match std::env::var("RUST_LOG") {
        Ok(v) if !v.trim().is_empty() => EnvFilter::from_default_env(),
        _ => EnvFilter::try_new(logging.level.clone()).map_err(|e| e.to_string())?,
    };

    let mut maybe_writer = None;

    if logging.file {
        let dir = log_dir(logging);
        std::fs::create_dir_all(&dir).map_err(|e| format!("create log dir failed: {e}"))?;
        let file_name = format!("uniflow.{}.log", std::process::id());
        let appender = tracing_appender::rolling::never(dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);
        let _ = LOG_GUARD.set(guard);
        maybe_writer = Some(non_blocking);
    }

    if !logging.console && maybe_writer.is_none() {
        return Err("logging disabled for both console and file".to_string());
    }

    let console_layer = logging.console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(atty::is(atty::Stream::Stderr))
    });

    let file_layer = maybe_writer.map(|w| {
        tracing_subscriber::fmt::layer()
            .with_writer(w)
            .with_ansi(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(())
}

/// `logging.directory` if set, else `~/.uniflow/logs`, else a temp dir.
fn log_dir(logging: &LoggingConfig) -> PathBuf {
    if let Some(dir) = logging
        .directory
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        return PathBuf::from(dir);
    }
    match get_uniflow_data_dir() {
        Ok(data_dir) => data_dir.join("logs"),
        Err(_) => std::env::temp_dir().join("uniflow"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_dir_prefers_configured_directory() {
        let logging = LoggingConfig {
            directory: Some(" /var/log/uniflow ".into()),
            ..LoggingConfig::default()
        };
        assert_eq!(log_dir(&logging), PathBuf::from("/var/log/uniflow"));
    }

    #[test]
    fn log_dir_defaults_under_data_dir() {
        let logging = LoggingConfig {
            directory: Some("  ".into()),
            ..LoggingConfig::default()
        };
        let expected = get_uniflow_data_dir()
            .map(|d| d.join("logs"))
            .unwrap_or_else(|_| std::env::temp_dir().join("uniflow"));
        assert_eq!(log_dir(&logging), expected);
    }
}
