//! CLI command handlers.

pub mod config;
pub mod console;
pub mod logout;
pub mod repl;
pub mod status;

use anyhow::{Context as _, Result};
use ruffed_client::{ClientBuilder, RuffedClient};
use ruffed_config::{LoadedConfig, RuffedConfig};

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// API root from `--api-url` / `RUFFED_API_URL`, if given.
    pub api_url: Option<String>,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
}

impl Context {
    /// Discover config files and apply the command-line override.
    pub fn load_config(&self) -> Result<LoadedConfig> {
        let mut loaded =
            ruffed_config::load_config(None).context("failed to load configuration")?;
        for warning in &loaded.warnings {
            tracing::warn!("{}", warning);
        }
        if let Some(url) = &self.api_url {
            loaded.config.set_api_url(url.clone());
            loaded.config.validate()?;
        }
        Ok(loaded)
    }

    /// Build a client from the effective configuration.
    pub fn client(&self, config: &RuffedConfig) -> Result<RuffedClient> {
        ClientBuilder::from_config(config)
            .build()
            .context("failed to create API client")
    }
}
