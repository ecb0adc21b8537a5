pub mod download;
pub mod factory;
pub mod services;
pub mod stage;
pub mod store;
