//! Config command - configuration management.

use anyhow::Result;
use clap::{Args, Subcommand};
use ruffed_config::RuffedConfig;

use super::Context;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the resolved configuration
    Show,

    /// Show which config files are loaded and their precedence
    Which,

    /// Show configuration file path
    Path,

    /// Initialize a config file with defaults
    Init {
        /// Create project-local config (./ruffed.toml) instead of user config
        #[arg(long)]
        local: bool,
    },
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => cmd_show(ctx),
        ConfigCommand::Which => cmd_which(ctx),
        ConfigCommand::Path => cmd_path(),
        ConfigCommand::Init { local } => cmd_init(local),
    }
}

fn cmd_show(ctx: &Context) -> Result<()> {
    let loaded = ctx.load_config()?;
    let config = &loaded.config;

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&effective(config))?);
        return Ok(());
    }

    println!("# ruffed Configuration\n");

    let sources = loaded.loaded_from();
    if sources.is_empty() {
        println!("No config files loaded (using defaults)\n");
    } else {
        println!("Config files:");
        for source in &sources {
            println!("  {}", source.display());
        }
        println!();
    }

    let api = config.api();
    println!("API:");
    println!("  url: {}", api.url);
    println!("  timeout: {}s", api.timeout_secs);
    println!();

    let session = config.session();
    println!("Session:");
    println!("  idle timeout: {}s", session.idle_timeout_secs);
    println!("  data dir: {}", session.effective_data_dir().display());
    println!();

    let logging = config.logging();
    println!("Logging:");
    println!("  log errors to server: {}", logging.log_errors_to_server);
    println!("  max errors: {}", logging.max_errors);
    println!();

    println!("SSO providers: {}\n", config.sso_providers().join(", "));

    if !loaded.warnings.is_empty() {
        println!("Warnings:");
        for w in &loaded.warnings {
            println!("  ⚠ {}", w);
        }
        println!();
    }

    if ctx.verbose {
        println!("---\nRaw config:\n");
        if let Ok(toml_str) = config.to_toml() {
            println!("{}", toml_str);
        }
    }

    Ok(())
}

/// Fully resolved settings, defaults included.
fn effective(config: &RuffedConfig) -> serde_json::Value {
    let api = config.api();
    let session = config.session();
    let logging = config.logging();
    serde_json::json!({
        "api": { "url": api.url, "timeout_secs": api.timeout_secs },
        "session": {
            "idle_timeout_secs": session.idle_timeout_secs,
            "data_dir": session.effective_data_dir(),
        },
        "logging": {
            "log_errors_to_server": logging.log_errors_to_server,
            "max_errors": logging.max_errors,
        },
        "sso": { "providers": config.sso_providers() },
    })
}

fn cmd_which(ctx: &Context) -> Result<()> {
    let loaded = ctx.load_config()?;

    println!("Config file search order (later overrides earlier):\n");

    for source in &loaded.sources {
        let status = if source.loaded {
            "✓ loaded"
        } else {
            "· not found"
        };
        println!("  {} {}", status, source.path.display());
    }

    println!();
    let loaded_count = loaded.loaded_from().len();
    if loaded_count == 0 {
        println!("No config files found. Run 'ruffed config init' to create one.");
    } else {
        println!("{} config file(s) loaded.", loaded_count);
    }

    Ok(())
}

fn cmd_path() -> Result<()> {
    match ruffed_config::xdg_config_path() {
        Some(path) => println!("{}", path.display()),
        None => println!("Could not determine config directory"),
    }
    Ok(())
}

fn cmd_init(local: bool) -> Result<()> {
    let path = if local {
        std::path::PathBuf::from("ruffed.toml")
    } else {
        ruffed_config::xdg_config_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
    };

    if path.exists() {
        println!("Config file already exists: {}", path.display());
        return Ok(());
    }

    ruffed_config::save_config(&RuffedConfig::with_defaults(), &path)?;
    println!("✓ Created {}", path.display());
    Ok(())
}
