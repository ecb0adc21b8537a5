use std::path::{Path, PathBuf};

use super::types::AppConfig;

/// Get the default uniflow data directory: ~/.uniflow
pub fn get_uniflow_data_dir() -> anyhow::Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(PathBuf::from(home).join(".uniflow"))
}

pub fn parse_config(s: &str) -> anyhow::Result<AppConfig> {
    Ok(toml::from_str::<AppConfig>(s)?)
}

pub fn load_default() -> anyhow::Result<AppConfig> {
    // Priority 1: ~/.uniflow/config.toml
    let data_dir = get_uniflow_data_dir()?;
    let home_config = data_dir.join("config.toml");

    // Priority 2: ./config.toml
    let local_config = Path::new("config.toml");

    let mut cfg: AppConfig = if home_config.exists() {
        parse_config(&std::fs::read_to_string(&home_config)?)?
    } else if local_config.exists() {
        parse_config(&std::fs::read_to_string(local_config)?)?
    } else {
        AppConfig::default()
    };

    if cfg
        .settings_store
        .path
        .as_deref()
        .map(|s| s.trim().is_empty())
        .unwrap_or(true)
    {
        cfg.settings_store.path = Some(
            data_dir
                .join("settings.json")
                .to_string_lossy()
                .to_string(),
        );
    }

    apply_env_overrides(&mut cfg);
    Ok(cfg)
}

/// Environment variables win over file values.
pub fn apply_env_overrides(cfg: &mut AppConfig) {
    if let Ok(v) = std::env::var("UNIFLOW_SETTINGS_PATH") {
        if !v.trim().is_empty() {
            cfg.settings_store.path = Some(v);
        }
    }
    if let Some(ms) = env_u64("UNIFLOW_INTER_ITEM_PAUSE_MS") {
        cfg.scheduler.inter_item_pause_ms = ms;
    }
    if let Some(ms) = env_u64("UNIFLOW_STAGE_TIMEOUT_MS") {
        cfg.http.stage_timeout_ms = ms;
    }
}

fn env_u64(key: &str) -> Option<u64> {
    let v = std::env::var(key).ok()?;
    match v.trim().parse::<u64>() {
        Ok(n) => Some(n),
        Err(_) => {
            tracing::warn!(key, value = %v, "ignoring non-numeric override");
            None
        }
    }
}
