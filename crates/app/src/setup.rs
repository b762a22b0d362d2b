use anyhow::{bail, Context, Result};
use now_playing_core::AppConfig;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

pub fn default_config_path() -> PathBuf {
    let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("now-playing").join("config.toml")
}

/// Reads `path` if it exists and overlays the environment on top. A missing
/// file means defaults; an unreadable or malformed one is an error.
pub fn load_config<F>(path: &Path, env: F) -> Result<AppConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut cfg = match std::fs::read_to_string(path) {
        Ok(data) => {
            toml::from_str(&data).with_context(|| format!("failed to parse {}", path.display()))?
        }
        Err(err) if err.kind() == ErrorKind::NotFound => AppConfig::default(),
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read {}", path.display()));
        }
    };
    cfg.apply_env_overrides(env);
    Ok(cfg)
}

pub fn write_default_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists; pass --force to overwrite it", path.display());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }
    let body = toml::to_string_pretty(&AppConfig::default())?;
    std::fs::write(path, body)
        .with_context(|| format!("failed to write config file {}", path.display()))
}

/// A blank level means `info`. Anything else must parse as filter directives.
pub fn log_filter(log_level: &str) -> Result<EnvFilter> {
    let directives = match log_level.trim() {
        "" => "info",
        level => level,
    };
    EnvFilter::try_new(directives)
        .with_context(|| format!("`log_level` {log_level:?} is not a valid log filter"))
}

pub fn init_logging(filter: EnvFilter) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .try_init();
}
