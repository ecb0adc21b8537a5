use serde::{Deserialize, Serialize};

use super::defaults::default_settings;
use crate::error::BatchError;
use crate::kv::KeyValueStore;
use crate::stage::Stage;

/// Key the settings record is stored under.
pub const SETTINGS_KEY: &str = "app_settings";

/// Connection settings for one remote stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageConfig {
    #[serde(default)]
    pub api_key: String,

    #[serde(default)]
    pub base_url: String,

    #[serde(default)]
    pub model: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<String>,

    /// Size hint, only read by the generation stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,
}

impl StageConfig {
    pub fn has_credential(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    pub fn has_endpoint(&self) -> bool {
        !self.base_url.trim().is_empty()
    }

    pub fn is_configured(&self) -> bool {
        self.has_credential() && self.has_endpoint()
    }

    /// Base URL without surrounding whitespace or a trailing slash.
    pub fn normalized_base_url(&self) -> &str {
        self.base_url.trim().trim_end_matches('/')
    }

    pub fn model_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        let model = self.model.trim();
        if model.is_empty() {
            fallback
        } else {
            model
        }
    }

    /// Non-empty trimmed instruction, if any.
    pub fn instruction(&self) -> Option<&str> {
        self.system_instruction
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Copy safe to print: the key is reduced to its last four characters.
    pub fn masked(&self) -> Self {
        let key = self.api_key.trim();
        let api_key = if key.is_empty() {
            String::new()
        } else if key.chars().count() <= 4 {
            "****".to_string()
        } else {
            let tail: String = key
                .chars()
                .rev()
                .take(4)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();
            format!("****{}", tail)
        };
        Self {
            api_key,
            ..self.clone()
        }
    }
}

/// User-supplied run configuration, persisted across sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    pub analysis_config: StageConfig,
    pub generation_config: StageConfig,
}

impl Default for AppSettings {
    fn default() -> Self {
        default_settings()
    }
}

impl AppSettings {
    pub fn stage(&self, stage: Stage) -> &StageConfig {
        match stage {
            Stage::Analysis => &self.analysis_config,
            Stage::Generation => &self.generation_config,
        }
    }

    pub fn stage_mut(&mut self, stage: Stage) -> &mut StageConfig {
        match stage {
            Stage::Analysis => &mut self.analysis_config,
            Stage::Generation => &mut self.generation_config,
        }
    }

    /// Both stages need an endpoint and a credential before a run may start.
    pub fn validate(&self) -> Result<(), BatchError> {
        for stage in [Stage::Analysis, Stage::Generation] {
            if !self.stage(stage).is_configured() {
                return Err(BatchError::ConfigurationMissing { stage });
            }
        }
        Ok(())
    }

    pub fn masked(&self) -> Self {
        Self {
            analysis_config: self.analysis_config.masked(),
            generation_config: self.generation_config.masked(),
        }
    }
}

/// Read the saved record, falling back to the defaults when none exists.
pub async fn load_settings(store: &dyn KeyValueStore) -> Result<AppSettings, BatchError> {
    let raw = store
        .get(SETTINGS_KEY)
        .await
        .map_err(|e| BatchError::Config(format!("read settings failed: {e}")))?;

    match raw {
        Some(raw) => serde_json::from_str::<AppSettings>(&raw)
            .map_err(|e| BatchError::Config(format!("saved settings are malformed: {e}"))),
        None => Ok(AppSettings::default()),
    }
}

pub async fn save_settings(
    store: &dyn KeyValueStore,
    settings: &AppSettings,
) -> Result<(), BatchError> {
    let raw = serde_json::to_string(settings)
        .map_err(|e| BatchError::Config(format!("encode settings failed: {e}")))?;
    store
        .set(SETTINGS_KEY, raw)
        .await
        .map_err(|e| BatchError::Config(format!("write settings failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::{DEFAULT_ANALYSIS_INSTRUCTION, DEFAULT_IMAGE_SIZE};
    use crate::kv::MemoryKvStore;
    use pretty_assertions::assert_eq;

    fn configured() -> AppSettings {
        AppSettings {
            analysis_config: StageConfig {
                api_key: "sk-vision-1234".into(),
                base_url: "https://vision.example.com/v1/".into(),
                model: "gpt-4o".into(),
                system_instruction: Some("Describe it".into()),
                aspect_ratio: None,
            },
            generation_config: StageConfig {
                api_key: "sk-gen".into(),
                base_url: "https://gen.example.com/v1".into(),
                model: String::new(),
                system_instruction: None,
                aspect_ratio: Some("16:9".into()),
            },
        }
    }

    #[tokio::test]
    async fn test_missing_record_yields_defaults() {
        let store = MemoryKvStore::new();
        let settings = load_settings(&store).await.unwrap();
        assert_eq!(settings.analysis_config.api_key, "");
        assert_eq!(
            settings.analysis_config.system_instruction.as_deref(),
            Some(DEFAULT_ANALYSIS_INSTRUCTION)
        );
        assert_eq!(
            settings.generation_config.aspect_ratio.as_deref(),
            Some(DEFAULT_IMAGE_SIZE)
        );
        assert!(matches!(
            settings.validate(),
            Err(BatchError::ConfigurationMissing {
                stage: Stage::Analysis
            })
        ));
    }

    #[tokio::test]
    async fn test_round_trip_field_for_field() {
        let store = MemoryKvStore::new();
        let saved = configured();
        save_settings(&store, &saved).await.unwrap();
        let loaded = load_settings(&store).await.unwrap();
        assert_eq!(loaded, saved);
    }

    #[tokio::test]
    async fn test_record_uses_camel_case_keys() {
        let store = MemoryKvStore::new();
        save_settings(&store, &configured()).await.unwrap();
        let raw = store.get(SETTINGS_KEY).await.unwrap().unwrap();
        let v: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(v["analysisConfig"]["apiKey"], "sk-vision-1234");
        assert_eq!(v["generationConfig"]["aspectRatio"], "16:9");
    }

    #[tokio::test]
    async fn test_malformed_record_is_config_error() {
        let store = MemoryKvStore::new();
        store.set(SETTINGS_KEY, "{not json".into()).await.unwrap();
        assert!(matches!(
            load_settings(&store).await,
            Err(BatchError::Config(_))
        ));
    }

    #[test]
    fn test_validate_reports_generation_stage() {
        let mut settings = configured();
        settings.generation_config.base_url = "   ".into();
        assert!(matches!(
            settings.validate(),
            Err(BatchError::ConfigurationMissing {
                stage: Stage::Generation
            })
        ));
    }

    #[test]
    fn test_stage_helpers() {
        let settings = configured();
        let analysis = &settings.analysis_config;
        assert_eq!(
            analysis.normalized_base_url(),
            "https://vision.example.com/v1"
        );
        assert_eq!(settings.generation_config.model_or("flux.1"), "flux.1");
        assert_eq!(analysis.masked().api_key, "****1234");
        assert!(settings.generation_config.instruction().is_none());
    }
}
