//! Fallback values, consulted in one place.

use super::settings::{AppSettings, StageConfig};

pub const DEFAULT_ANALYSIS_INSTRUCTION: &str = "Describe this image in detail to create a stable diffusion prompt. Focus on artistic style, composition, and subjects.";

/// Instruction sent to the vision model when the saved one is empty.
pub const FALLBACK_VISION_INSTRUCTION: &str =
    "Analyze this image and output a detailed prompt for generating a similar image. Only output the prompt.";

pub const DEFAULT_VISION_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_GENERATION_MODEL: &str = "flux.1";
pub const DEFAULT_IMAGE_SIZE: &str = "1024x1024";

pub const DEFAULT_STAGE_TIMEOUT_MS: u64 = 120_000;
pub const DEFAULT_INTER_ITEM_PAUSE_MS: u64 = 300;

/// Settings used when nothing has been saved yet. Credentials and endpoints
/// are empty, so a run refuses to start until the user supplies them.
pub fn default_settings() -> AppSettings {
    AppSettings {
        analysis_config: StageConfig {
            system_instruction: Some(DEFAULT_ANALYSIS_INSTRUCTION.to_string()),
            ..StageConfig::default()
        },
        generation_config: StageConfig {
            aspect_ratio: Some(DEFAULT_IMAGE_SIZE.to_string()),
            system_instruction: Some(String::new()),
            ..StageConfig::default()
        },
    }
}
