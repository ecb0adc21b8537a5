use uniflow_core::api::{load_settings, save_settings, AppContext, AppSettings};
use uniflow_core::config::SETTINGS_KEY;

use super::cli::{SetArgs, SettingsArgs, SettingsCommand};
use crate::error::CliError;

pub async fn settings_cmd(args: SettingsArgs, ctx: &AppContext) -> Result<i32, CliError> {
    let store = ctx.build_services().await?.settings;

    match args.command {
        SettingsCommand::Show => {
            let settings = load_settings(store.as_ref()).await?;
            print_masked(&settings)?;
        }
        SettingsCommand::Set(set) => {
            let mut settings = load_settings(store.as_ref()).await?;
            apply_set(&mut settings, &set);
            save_settings(store.as_ref(), &settings).await?;
            tracing::info!(target: "uniflow.cli", stage = ?set.stage, store = store.name(), "settings updated");
            print_masked(&settings)?;
        }
        SettingsCommand::Reset => {
            store.remove(SETTINGS_KEY).await?;
            println!("Settings reset to defaults.");
        }
    }
    Ok(0)
}

fn print_masked(settings: &AppSettings) -> Result<(), CliError> {
    let text = serde_json::to_string_pretty(&settings.masked())
        .map_err(|e| CliError::Command(format!("encode settings failed: {e}")))?;
    println!("{}", text);
    Ok(())
}

fn apply_set(settings: &mut AppSettings, set: &SetArgs) {
    let cfg = settings.stage_mut(set.stage.into());
    if let Some(v) = &set.api_key {
        cfg.api_key = v.trim().to_string();
    }
    if let Some(v) = &set.base_url {
        cfg.base_url = v.trim().to_string();
    }
    if let Some(v) = &set.model {
        cfg.model = v.trim().to_string();
    }
    if let Some(v) = &set.instruction {
        cfg.system_instruction = Some(v.clone());
    }
    if let Some(v) = &set.aspect_ratio {
        let v = v.trim();
        cfg.aspect_ratio = (!v.is_empty()).then(|| v.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::cli::StageArg;

    fn set_args(stage: StageArg) -> SetArgs {
        SetArgs {
            stage,
            api_key: None,
            base_url: None,
            model: None,
            instruction: None,
            aspect_ratio: None,
        }
    }

    #[test]
    fn apply_set_touches_only_given_fields() {
        let mut settings = AppSettings::default();
        let before = settings.analysis_config.clone();

        let mut set = set_args(StageArg::Generation);
        set.api_key = Some(" sk-new ".into());
        set.base_url = Some("https://img.example/v1".into());
        set.aspect_ratio = Some(" ".into());
        apply_set(&mut settings, &set);

        assert_eq!(settings.analysis_config, before);
        assert_eq!(settings.generation_config.api_key, "sk-new");
        assert_eq!(settings.generation_config.base_url, "https://img.example/v1");
        assert_eq!(settings.generation_config.aspect_ratio, None);
        assert_eq!(
            settings.generation_config.system_instruction.as_deref(),
            Some("")
        );
    }

    #[test]
    fn apply_set_instruction() {
        let mut settings = AppSettings::default();
        let mut set = set_args(StageArg::Analysis);
        set.instruction = Some("Short captions only.".into());
        apply_set(&mut settings, &set);
        assert_eq!(
            settings.analysis_config.instruction(),
            Some("Short captions only.")
        );
    }
}
