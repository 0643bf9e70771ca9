//! Logout command - clears the locally stored session.

use anyhow::Result;
use clap::Args;
use ruffed_session::{FileSessionStore, SessionStore};

use super::Context;

/// Arguments for the logout command.
#[derive(Args, Debug)]
pub struct LogoutArgs {}

/// Run the logout command.
///
/// Server-side sessions end with the console process (the cookies live in
/// memory); this only removes the stored user.
pub async fn run(_args: LogoutArgs, ctx: &Context) -> Result<()> {
    let loaded = ctx.load_config()?;
    let store = FileSessionStore::new(&loaded.config.session().effective_data_dir());

    let previous = store.get_user();
    store.clear_user_data()?;

    if ctx.json_output {
        let output = serde_json::json!({
            "cleared": previous.is_some(),
            "path": store.path().display().to_string(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        match previous {
            Some(user) => println!("✓ Cleared stored session for {}", user.username),
            None => println!("No stored session"),
        }
    }

    Ok(())
}
