//! Status command - shows the stored session and effective settings.

use ::console::{Style, style};
use anyhow::Result;
use clap::Args;
use ruffed_session::{FileSessionStore, SessionStore, UserInfo};
use serde::Serialize;

use super::Context;

/// Arguments for the status command.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Also show session and logging settings
    #[arg(short, long)]
    pub detailed: bool,
}

/// Status for JSON output.
#[derive(Debug, Serialize)]
struct StatusOutput {
    logged_in: bool,
    user: Option<UserInfo>,
    api_url: String,
    session_file: String,
    idle_timeout_secs: u64,
    log_errors_to_server: bool,
}

/// Run the status command.
pub async fn run(args: StatusArgs, ctx: &Context) -> Result<()> {
    let loaded = ctx.load_config()?;
    let config = &loaded.config;
    let store = FileSessionStore::new(&config.session().effective_data_dir());
    let user = store.get_user();

    let output = StatusOutput {
        logged_in: user.is_some(),
        user,
        api_url: config.api().url,
        session_file: store.path().display().to_string(),
        idle_timeout_secs: config.session().idle_timeout().as_secs(),
        log_errors_to_server: config.logging().log_errors_to_server,
    };

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let green = Style::new().green();
    let dim = Style::new().dim();

    println!();
    println!("{}", style("ruffed Session Status").bold());
    println!("{}", dim.apply_to("─".repeat(40)));
    println!();
    match &output.user {
        Some(user) => {
            println!(
                "  {} {} {}",
                dim.apply_to("User:"),
                green.apply_to("●"),
                user.display_name()
            );
            println!("  {} {}", dim.apply_to("Roles:"), user.roles.join(", "));
        }
        None => println!("  {} {}", dim.apply_to("User:"), "not logged in"),
    }
    println!("  {} {}", dim.apply_to("API:"), output.api_url);

    if args.detailed || ctx.verbose {
        println!();
        println!("{}", dim.apply_to("─".repeat(40)));
        println!();
        println!("  {} {}", dim.apply_to("Session file:"), output.session_file);
        println!(
            "  {} {}s",
            dim.apply_to("Idle timeout:"),
            output.idle_timeout_secs
        );
        println!(
            "  {} {}",
            dim.apply_to("Server error log:"),
            if output.log_errors_to_server { "on" } else { "off" }
        );
    }

    println!();
    Ok(())
}
