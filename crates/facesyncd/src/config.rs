use facesync_core::config::{default_config_path, Config, ConfigError};
use std::path::PathBuf;

/// Daemon configuration: the shared TOML file plus `FACESYNCD_*` overrides.
pub struct DaemonConfig {
    /// Config file the sync settings were read from.
    pub config_path: PathBuf,
    pub sync: Config,
    /// Discard every write (default: off).
    pub dry_run: bool,
    /// Serve on the system bus instead of the session bus.
    pub system_bus: bool,
}

impl DaemonConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let config_path = default_config_path();
        let sync = Config::load_or_default(None)?;
        Ok(Self {
            config_path,
            sync,
            dry_run: env_bool("FACESYNCD_DRY_RUN", false),
            system_bus: env_bool("FACESYNCD_SYSTEM_BUS", false),
        })
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v != "0" && !v.is_empty())
        .unwrap_or(default)
}
