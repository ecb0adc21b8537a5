#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tokio::sync::Notify;

use uniflow_core::api::{
    AppSettings, BatchController, GenerationStage, ImageHandle, ItemId, MemoryKvStore,
    PromptStream, SchedulerOptions, Services, SourceImage, Stage, StageConfig, StageError,
    VisionStage, WorkItem, WorkflowStatus,
};
use uniflow_core::events_out::EventLog;

/// Holds a stage call open until the test lets it go.
#[derive(Default)]
pub struct Gate {
    pub entered: Notify,
    pub release: Notify,
}

impl Gate {
    pub async fn wait_entered(&self) {
        tokio::time::timeout(Duration::from_secs(5), self.entered.notified())
            .await
            .expect("stage call never reached the gate");
    }

    pub fn open(&self) {
        self.release.notify_one();
    }
}

/// Per-file behavior shared by both fake stages.
#[derive(Default)]
pub struct Script {
    failures: Mutex<HashMap<String, usize>>,
    gates: Mutex<HashMap<String, Arc<Gate>>>,
    calls: Mutex<Vec<String>>,
}

impl Script {
    /// Fail the next `times` calls for `file`.
    pub fn fail(&self, file: &str, times: usize) {
        self.failures
            .lock()
            .unwrap()
            .insert(file.to_string(), times);
    }

    pub fn fail_always(&self, file: &str) {
        self.fail(file, usize::MAX);
    }

    pub fn gate(&self, file: &str) -> Arc<Gate> {
        let gate = Arc::new(Gate::default());
        self.gates
            .lock()
            .unwrap()
            .insert(file.to_string(), gate.clone());
        gate
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    async fn enter(&self, file: &str) -> bool {
        self.calls.lock().unwrap().push(file.to_string());

        let gate = self.gates.lock().unwrap().remove(file);
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }

        let mut failures = self.failures.lock().unwrap();
        match failures.get_mut(file) {
            Some(left) if *left > 0 => {
                if *left != usize::MAX {
                    *left -= 1;
                }
                false
            }
            _ => true,
        }
    }
}

#[derive(Default)]
pub struct ScriptedVision {
    pub script: Script,
}

#[async_trait]
impl VisionStage for ScriptedVision {
    fn name(&self) -> &str {
        "scripted-vision"
    }

    async fn describe_image(
        &self,
        image: &SourceImage,
        _config: &StageConfig,
    ) -> Result<PromptStream, StageError> {
        if !self.script.enter(&image.file_name).await {
            return Err(StageError::Status {
                stage: Stage::Analysis,
                code: 500,
                body: format!("cannot read {}", image.file_name),
            });
        }
        Ok(stream::iter(prefixes(&image.file_name).into_iter().map(Ok)).boxed())
    }
}

#[derive(Default)]
pub struct ScriptedGeneration {
    pub script: Script,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGeneration {
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationStage for ScriptedGeneration {
    fn name(&self) -> &str {
        "scripted-generation"
    }

    async fn generate_image(
        &self,
        image: &SourceImage,
        prompt: &str,
        _config: &StageConfig,
    ) -> Result<ImageHandle, StageError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if !self.script.enter(&image.file_name).await {
            return Err(StageError::NoImage);
        }
        Ok(result_for(&image.file_name))
    }
}

/// Growing prefixes the fake vision stage yields for `file`.
pub fn prefixes(file: &str) -> Vec<String> {
    vec![
        "a".to_string(),
        "a photo".to_string(),
        format!("a photo of {}", file),
    ]
}

pub fn result_for(file: &str) -> ImageHandle {
    ImageHandle::Url(format!("https://img.test/{}", file))
}

pub fn configured_settings() -> AppSettings {
    let mut settings = AppSettings::default();
    for stage in [Stage::Analysis, Stage::Generation] {
        let cfg = settings.stage_mut(stage);
        cfg.api_key = format!("sk-{}", stage);
        cfg.base_url = "http://127.0.0.1:9".to_string();
    }
    settings
}

pub fn images(names: &[&str]) -> Vec<SourceImage> {
    names
        .iter()
        .map(|n| SourceImage::new(*n, format!("bytes of {}", n).into_bytes()))
        .collect()
}

pub struct Harness {
    pub controller: BatchController,
    pub vision: Arc<ScriptedVision>,
    pub generation: Arc<ScriptedGeneration>,
    pub kv: MemoryKvStore,
}

/// Controller over scripted stages with no saved settings.
pub fn unconfigured() -> Harness {
    let vision = Arc::new(ScriptedVision::default());
    let generation = Arc::new(ScriptedGeneration::default());
    let kv = MemoryKvStore::new();
    let controller = BatchController::new(
        Services {
            vision: vision.clone(),
            generation: generation.clone(),
            settings: Arc::new(kv.clone()),
        },
        EventLog::new(),
        SchedulerOptions {
            inter_item_pause: Duration::from_millis(1),
        },
    );
    Harness {
        controller,
        vision,
        generation,
        kv,
    }
}

/// Controller over scripted stages with both stages configured.
pub async fn harness() -> Harness {
    let h = unconfigured();
    h.controller
        .save_settings(&configured_settings())
        .await
        .unwrap();
    h
}

impl Harness {
    pub async fn item(&self, id: &ItemId) -> WorkItem {
        self.controller.get(id).await.expect("item missing")
    }

    pub async fn status(&self, id: &ItemId) -> WorkflowStatus {
        self.item(id).await.status
    }
}
