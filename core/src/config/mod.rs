pub mod defaults;
mod load;
mod settings;
mod types;

pub use load::{apply_env_overrides, get_uniflow_data_dir, load_default, parse_config};
pub use settings::{load_settings, save_settings, AppSettings, StageConfig, SETTINGS_KEY};
pub use types::{
    AppConfig, EventsOutConfig, HttpConfig, LoggingConfig, SchedulerConfig, SettingsStoreConfig,
};
