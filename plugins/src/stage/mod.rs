//! OpenAI-compatible stage clients.

mod generation;
mod http;
pub mod sse;
mod vision;

pub use generation::{compose_prompt, parse_image_response, OpenAiImageStage};
pub use http::build_client;
pub use vision::OpenAiVisionStage;
