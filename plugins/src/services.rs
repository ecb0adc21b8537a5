//! ServicesFactory implementation: builds the stage clients and the settings
//! store from config so the CLI can assemble a controller.
use async_trait::async_trait;
use uniflow_core::api::{AppConfig, BatchError, Services, ServicesFactory};

use crate::factory;

pub struct PluginServicesFactory;

impl Default for PluginServicesFactory {
    fn default() -> Self {
        Self
    }
}

#[async_trait]
impl ServicesFactory for PluginServicesFactory {
    async fn build_services(&self, cfg: &AppConfig) -> Result<Services, BatchError> {
        let plugin_err = |e: anyhow::Error| BatchError::Config(format!("{:#}", e));
        Ok(Services {
            vision: factory::build_vision(cfg).map_err(plugin_err)?,
            generation: factory::build_generation(cfg).map_err(plugin_err)?,
            settings: factory::build_settings_store(cfg).map_err(plugin_err)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use uniflow_core::api::AppContext;

    #[tokio::test]
    async fn test_context_builds_controller_with_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = AppConfig::default();
        cfg.settings_store.path = Some(dir.path().join("s.json").to_string_lossy().to_string());

        let ctx = AppContext::new(cfg, Some(Arc::new(PluginServicesFactory)))
            .await
            .unwrap();
        let controller = ctx.build_controller().await.unwrap();

        let mut settings = controller.load_settings().await.unwrap();
        assert!(settings.validate().is_err());
        settings.analysis_config.api_key = "sk".into();
        controller.save_settings(&settings).await.unwrap();
        assert!(dir.path().join("s.json").exists());
    }
}
