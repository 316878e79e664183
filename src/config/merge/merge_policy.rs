//! Merge rules: defaults, override order, conflict handling.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment};

/// Prefix of environment overrides, e.g. `SCRIPTDEPLOY__SOURCE__URL`.
pub const ENV_PREFIX: &str = "SCRIPTDEPLOY";
pub const ENV_SEPARATOR: &str = "__";

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("instance.name", "default")?
        .set_default("instance.disabled", false)?
        .set_default("source.kind", "git")?
        .set_default("source.branch", "main")?
        .set_default("check.time", "03:00:00")?
        .set_default("check.lock_timeout_ms", 5000)
}

/// Environment variables override every file source.
pub fn add_environment(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator(ENV_SEPARATOR)
            .separator(ENV_SEPARATOR)
            .try_parsing(true),
    )
}
