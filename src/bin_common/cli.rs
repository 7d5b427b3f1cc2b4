//! CLI utilities for binaries
//!
//! Both executables take no flags; the only knob is the configuration file
//! location, resolved from the environment.

use std::path::PathBuf;

/// Environment variable that overrides the config location.
pub const CONFIG_ENV_VAR: &str = "CONFIG_PATH";

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "config/settings.yaml";

/// Resolve the configuration path from the environment or the default.
pub fn config_path_from_env() -> PathBuf {
    std::env::var(CONFIG_ENV_VAR)
        .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
        .into()
}
