use crate::settings::Settings;
use crate::utils::PathPair;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::info;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Load and validate settings from a YAML file
pub fn load_settings(settings_path: &Path) -> Result<Settings> {
    info!("Loading settings from: {:?}", settings_path);

    let file = File::open(settings_path)
        .wrap_err_with(|| format!("Failed to open settings file '{}'", settings_path.display()))?;
    let settings: Settings = serde_yaml::from_reader(file)
        .wrap_err_with(|| format!("Failed to parse settings file '{}'", settings_path.display()))?;

    settings.validate()?;
    Ok(settings)
}

/// Load settings from `settings_path` when given, otherwise use the defaults
pub fn load_settings_or_default(settings_path: Option<&Path>) -> Result<Settings> {
    match settings_path {
        Some(path) => load_settings(path),
        None => {
            info!("No settings file given, using defaults");
            Ok(Settings::default())
        }
    }
}

/// CLI arguments that override settings file values
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub config_file: Option<PathBuf>,
    pub registry_file: Option<PathBuf>,
    pub interface: Option<String>,
    pub no_apply: bool,
}

/// Apply CLI overrides to loaded settings.
///
/// A file given on the command line is used as both the primary and the
/// fallback location.
pub fn apply_overrides(settings: &mut Settings, overrides: &SettingsOverrides) -> Result<()> {
    if let Some(path) = &overrides.config_file {
        info!("Config file overridden: {:?}", path);
        settings.config = PathPair::single(path);
    }
    if let Some(path) = &overrides.registry_file {
        info!("Registry file overridden: {:?}", path);
        settings.registry = PathPair::single(path);
    }
    if let Some(interface) = &overrides.interface {
        settings.interface = interface.clone();
    }
    if overrides.no_apply {
        settings.apply_to_interface = false;
    }

    // Re-validate after applying overrides
    settings.validate()?;
    Ok(())
}
