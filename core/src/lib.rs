pub mod api;
pub mod config;
pub mod context;
pub mod controller;
pub mod error;
pub mod events_out;
pub mod kv;
pub mod scheduler;
pub mod stage;
pub mod state;
