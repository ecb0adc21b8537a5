#[allow(clippy::module_inception)]
pub mod error;
pub mod stage;

pub use error::BatchError;
pub use stage::{StageError, TransportKind};
