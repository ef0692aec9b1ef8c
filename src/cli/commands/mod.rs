pub mod migrate;
pub mod serve;
pub mod user;

use anyhow::Context;

use crate::config::AppConfig;

/// Load and validate configuration from the environment
pub(crate) fn load_config() -> anyhow::Result<AppConfig> {
    let config = AppConfig::from_env();
    config.validate().context("invalid configuration")?;
    Ok(config)
}
