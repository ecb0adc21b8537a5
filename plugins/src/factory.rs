use std::sync::Arc;

use anyhow::Result;

use uniflow_core::api::{AppConfig, EventLog, GenerationStage, KeyValueStore, VisionStage};

use crate::download::Downloader;
use crate::stage::{OpenAiImageStage, OpenAiVisionStage};
use crate::store::FileKvStore;

pub fn build_vision(cfg: &AppConfig) -> Result<Arc<dyn VisionStage>> {
    Ok(Arc::new(OpenAiVisionStage::new(cfg.http.stage_timeout_ms)?))
}

pub fn build_generation(cfg: &AppConfig) -> Result<Arc<dyn GenerationStage>> {
    Ok(Arc::new(OpenAiImageStage::new(cfg.http.stage_timeout_ms)?))
}

pub fn build_settings_store(cfg: &AppConfig) -> Result<Arc<dyn KeyValueStore>> {
    let store = match cfg
        .settings_store
        .path
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
    {
        Some(path) => FileKvStore::new(path),
        None => FileKvStore::default_location()?,
    };
    tracing::debug!(target: "uniflow.factory", path = %store.path().display(), "settings store");
    Ok(Arc::new(store))
}

pub fn build_downloader(cfg: &AppConfig, log: EventLog) -> Result<Downloader> {
    Downloader::new(cfg.http.stage_timeout_ms, log)
}
