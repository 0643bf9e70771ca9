//! Configuration system for the ruffed certificate console.
//!
//! Provides TOML-based configuration with:
//! - API endpoint and request timeout (`[api]`)
//! - Session idle window and storage location (`[session]`)
//! - Error reporting switches (`[logging]`)
//! - Enabled SSO providers (`[sso]`)
//!
//! Config files are layered: the user config directory first, then a
//! project-local `ruffed.toml`, then environment overrides.

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    API_URL_ENV, load_config, load_config_file, load_config_with_options, save_config,
    xdg_config_dir, xdg_config_path, ConfigSource, LoadedConfig,
};
pub use error::{ConfigError, Result};
pub use types::*;
