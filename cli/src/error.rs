use thiserror::Error;

use uniflow_core::api::BatchError;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("config error: {0}")]
    Config(String),
    #[error(transparent)]
    Batch(#[from] BatchError),
    #[error("command failed: {0}")]
    Command(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

impl CliError {
    // 0: success
    // 1: run finished with failed items (returned as a normal exit code)
    // 11: config error
    // 20: IO error
    // 50: internal/uncategorized
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) => 11,
            CliError::Batch(be) => match be {
                BatchError::ConfigurationMissing { .. } | BatchError::Config(_) => 11,
                BatchError::Io(_) => 20,
                _ => 50,
            },
            CliError::Io(_) => 20,
            CliError::Command(_) => 20,
            CliError::Anyhow(_) => 50,
        }
    }
}
