pub mod log;
pub mod writer;

pub use crate::config::EventsOutConfig;
pub use log::{EventLog, LogLevel, SystemLog};
pub use writer::{start_events_out, EventsOutTx};
