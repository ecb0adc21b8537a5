//! Remote stage contracts.
//!
//! The vision stage yields a lazy, finite sequence of growing prompt prefixes
//! whose last element is the finished analysis; the generation stage resolves
//! to a single [`ImageHandle`].

mod traits;
mod types;

pub use traits::{GenerationStage, PromptStream, VisionStage};
pub use types::{extension_for_mime, mime_for_name, ImageHandle, SourceImage, Stage};
