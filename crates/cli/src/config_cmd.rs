// `pricewise config check` and `pricewise config default`.

use std::path::PathBuf;

use pricewise_pricing::PipelineConfig;

use crate::settings::{self, ConfigSource, CONFIG_ENV};
use crate::CliError;

pub fn cmd_check(file: Option<PathBuf>) -> Result<(), CliError> {
    let source = settings::resolve(file.as_deref(), std::env::var_os(CONFIG_ENV).map(PathBuf::from));
    match source {
        ConfigSource::Flag(path) | ConfigSource::Env(path) | ConfigSource::UserDir(path) => {
            let config = settings::load_file(&path)?;
            println!(
                "ok: {} ({} dedup strategies, {} cost columns)",
                path.display(),
                config.dedup.strategies.len(),
                config.cost_catalog.columns.len()
            );
        }
        ConfigSource::Defaults => {
            println!(
                "ok: no config file found, using built-in defaults (looked for {})",
                settings::user_config_path().display()
            );
        }
    }
    Ok(())
}

pub fn cmd_default() -> Result<(), CliError> {
    let text = PipelineConfig::default()
        .to_toml()
        .map_err(|e| CliError::other(e.to_string()))?;
    print!("{}", text);
    Ok(())
}
