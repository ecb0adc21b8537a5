use async_trait::async_trait;
use futures::stream::BoxStream;

use super::types::{ImageHandle, SourceImage};
use crate::config::StageConfig;
use crate::error::StageError;

/// Growing-prefix text stream produced by a vision stage. Not restartable.
pub type PromptStream = BoxStream<'static, Result<String, StageError>>;

#[async_trait]
pub trait VisionStage: Send + Sync {
    fn name(&self) -> &str;

    /// Start analysis of `image`. Request-level failures (missing credential,
    /// non-2xx status) surface here; mid-stream failures surface as stream items.
    async fn describe_image(
        &self,
        image: &SourceImage,
        config: &StageConfig,
    ) -> Result<PromptStream, StageError>;
}

#[async_trait]
pub trait GenerationStage: Send + Sync {
    fn name(&self) -> &str;

    async fn generate_image(
        &self,
        image: &SourceImage,
        prompt: &str,
        config: &StageConfig,
    ) -> Result<ImageHandle, StageError>;
}
