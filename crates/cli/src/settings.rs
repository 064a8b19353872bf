// Pipeline config discovery: --config, $PRICEWISE_CONFIG, the user config
// directory, then built-in defaults.

use std::fs;
use std::path::{Path, PathBuf};

use pricewise_pricing::PipelineConfig;
use tracing::{debug, info};

use crate::exit_codes::{EXIT_CONFIG, EXIT_INPUT};
use crate::CliError;

pub const CONFIG_ENV: &str = "PRICEWISE_CONFIG";

/// Where a loaded config came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Flag(PathBuf),
    Env(PathBuf),
    UserDir(PathBuf),
    Defaults,
}

/// `<config_dir>/pricewise/pricewise.toml`
pub fn user_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pricewise")
        .join("pricewise.toml")
}

/// Pick the config file to use, without reading it.
pub fn resolve(flag: Option<&Path>, env: Option<PathBuf>) -> ConfigSource {
    if let Some(path) = flag {
        return ConfigSource::Flag(path.to_path_buf());
    }
    if let Some(path) = env.filter(|p| !p.as_os_str().is_empty()) {
        return ConfigSource::Env(path);
    }
    let user = user_config_path();
    if user.is_file() {
        return ConfigSource::UserDir(user);
    }
    ConfigSource::Defaults
}

/// Read and validate a config file.
pub fn load_file(path: &Path) -> Result<PipelineConfig, CliError> {
    let contents = fs::read_to_string(path).map_err(|e| CliError {
        code: EXIT_INPUT,
        message: format!("cannot read config {}: {}", path.display(), e),
        hint: None,
    })?;
    PipelineConfig::from_toml(&contents).map_err(|e| CliError {
        code: EXIT_CONFIG,
        message: format!("{}: {}", path.display(), e),
        hint: Some("run `pricewise config default` for a complete example".to_string()),
    })
}

/// Resolve and load the pipeline config for a command.
pub fn load(flag: Option<&Path>) -> Result<PipelineConfig, CliError> {
    let source = resolve(flag, std::env::var_os(CONFIG_ENV).map(PathBuf::from));
    debug!(?source, "config source");
    match source {
        ConfigSource::Flag(path) | ConfigSource::Env(path) | ConfigSource::UserDir(path) => {
            let config = load_file(&path)?;
            info!(path = %path.display(), "config loaded");
            Ok(config)
        }
        ConfigSource::Defaults => Ok(PipelineConfig::default()),
    }
}
