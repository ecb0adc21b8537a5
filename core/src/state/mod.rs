//! # Work item state
//!
//! The ordered item store, the per-item data model and the lifecycle table.
//!
//! ```text
//! Pending -> Analyzing -> Generating -> Completed
//!               |             |
//!               +--> Error <--+
//! Error --(retry)--> Pending
//! ```

pub mod store;
pub mod transitions;
pub mod types;

pub use store::WorkItemStore;
pub use transitions::{StateTransition, TransitionError};
pub use types::{
    ItemId, ItemPatch, NotesPatch, ProcessingStats, StoreEvent, WorkItem, WorkflowStatus,
};
