use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

use uniflow_core::api::Stage;

#[derive(Parser, Debug)]
#[command(name = "uniflow", version, about = "Batch image re-prompting pipeline")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Queue images and process them through both stages.
    SubmitAndRun(RunArgs),
    /// Inspect or edit the saved stage settings.
    Settings(SettingsArgs),
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RunArgs {
    /// Image files, processed in the order given.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Save completed results here as `processed-<name>`.
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Print the run summary as JSON instead of text.
    #[arg(long)]
    pub json: bool,

    /// Disable progress bars.
    #[arg(long)]
    pub no_progress: bool,
}

#[derive(ClapArgs, Debug)]
pub struct SettingsArgs {
    #[command(subcommand)]
    pub command: SettingsCommand,
}

#[derive(Subcommand, Debug)]
pub enum SettingsCommand {
    /// Print the settings as JSON with keys masked.
    Show,
    /// Update fields of one stage; unspecified fields are kept.
    Set(SetArgs),
    /// Restore defaults.
    Reset,
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageArg {
    Analysis,
    Generation,
}

impl From<StageArg> for Stage {
    fn from(value: StageArg) -> Self {
        match value {
            StageArg::Analysis => Stage::Analysis,
            StageArg::Generation => Stage::Generation,
        }
    }
}

#[derive(ClapArgs, Debug, Clone)]
pub struct SetArgs {
    #[arg(long, value_enum)]
    pub stage: StageArg,

    #[arg(long)]
    pub api_key: Option<String>,

    #[arg(long)]
    pub base_url: Option<String>,

    #[arg(long)]
    pub model: Option<String>,

    /// Instruction text; pass an empty string to clear it.
    #[arg(long)]
    pub instruction: Option<String>,

    /// Output size hint for the generation stage, e.g. `1024x1024`.
    #[arg(long)]
    pub aspect_ratio: Option<String>,
}
