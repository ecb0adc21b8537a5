//! Stable re-exports for consumers (`cli`, `plugins`, and external crates).
//!
//! Prefer importing from `uniflow_core::api` instead of reaching into internal modules.

pub use crate::config::{
    load_default, load_settings, save_settings, AppConfig, AppSettings, HttpConfig,
    LoggingConfig, StageConfig,
};
pub use crate::context::{AppContext, Services, ServicesFactory};
pub use crate::controller::BatchController;
pub use crate::error::{BatchError, StageError, TransportKind};
pub use crate::events_out::{EventLog, EventsOutTx, LogLevel, SystemLog};
pub use crate::kv::{KeyValueStore, MemoryKvStore};
pub use crate::scheduler::{BatchScheduler, RunOutcome, RunSummary, SchedulerOptions, StopSignal};
pub use crate::stage::{
    extension_for_mime, mime_for_name, GenerationStage, ImageHandle, PromptStream, SourceImage,
    Stage, VisionStage,
};
pub use crate::state::{
    ItemId, ProcessingStats, StateTransition, StoreEvent, WorkItem, WorkItemStore, WorkflowStatus,
};
