//! Console command - interactive authenticated session.

use anyhow::Result;
use clap::Args;
use ruffed_client::{LogoutReason, RuffedClient, SessionEvent};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use super::Context;
use super::repl::Repl;

/// Arguments for the console command.
#[derive(Args, Debug)]
pub struct ConsoleArgs {
    /// Log in as this user on startup
    #[arg(short, long)]
    pub user: Option<String>,
}

/// Run the console command (REPL).
pub async fn run(args: ConsoleArgs, ctx: &Context) -> Result<()> {
    let loaded = ctx.load_config()?;
    let client = ctx.client(&loaded.config)?;
    let printer = spawn_event_printer(&client);

    // Cookies do not outlive the process, so a stored user has to be
    // re-validated against the server before it is trusted.
    if let Some(user) = client.auth().restore().await {
        tracing::info!(user = %user.username, "Verifying stored session");
        if let Err(e) = client.auth().fetch_current_user().await {
            tracing::debug!(error = %e, "Stored session is no longer valid");
        }
    }

    let mut repl = Repl::new(
        client.clone(),
        loaded.config.sso_providers(),
        ctx.json_output,
        ctx.verbose,
    )?;
    if let Some(user) = args.user.as_deref()
        && let Err(e) = repl.login(Some(user)).await
    {
        eprintln!("Login failed: {}", e);
    }

    let result = repl.run().await;
    printer.abort();
    result
}

/// Print lifecycle events the user did not trigger directly.
fn spawn_event_printer(client: &RuffedClient) -> JoinHandle<()> {
    let mut events = client.subscribe_events();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(SessionEvent::LoggedOut {
                    reason: LogoutReason::IdleTimeout,
                }) => {
                    println!("\nLogged out after a period of inactivity. Log in again to continue.");
                }
                Ok(SessionEvent::LoggedOut {
                    reason: LogoutReason::RefreshFailed,
                }) => {
                    println!("\nYour session has expired. Log in again to continue.");
                }
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            }
        }
    })
}
