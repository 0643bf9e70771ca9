//! REPL (Read-Eval-Print Loop) driving one authenticated session.

use ::console::{Style, style};
use anyhow::{Result, bail};
use ruffed_client::{
    ActivityEvent, Error as ClientError, LoginCredentials, RegisterRequest, RuffedClient,
};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Config, Editor};
use serde_json::Value;

/// REPL state and configuration.
pub struct Repl {
    client: RuffedClient,
    /// SSO providers enabled in the configuration.
    providers: Vec<String>,
    editor: Editor<(), DefaultHistory>,
    json: bool,
    verbose: bool,
}

impl Repl {
    /// Create a new REPL instance.
    pub fn new(
        client: RuffedClient,
        providers: Vec<String>,
        json: bool,
        verbose: bool,
    ) -> Result<Self> {
        let config = Config::builder()
            .history_ignore_space(true)
            .auto_add_history(true)
            .build();

        let editor = Editor::with_config(config)?;

        Ok(Self {
            client,
            providers,
            editor,
            json,
            verbose,
        })
    }

    /// Run the REPL loop.
    pub async fn run(&mut self) -> Result<()> {
        self.print_welcome();

        loop {
            let prompt = self.format_prompt();

            match self.editor.readline(&prompt) {
                Ok(line) => {
                    // Typing is user activity, even for empty lines.
                    self.client.record_activity(ActivityEvent::KeyPress);

                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }

                    match self.handle_command(line).await {
                        Ok(ControlFlow::Continue) => continue,
                        Ok(ControlFlow::Exit) => break,
                        Err(e) => self.print_error(&e.to_string()),
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!();
                    self.print_dim("(Interrupted - type quit to exit)");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!();
                    break;
                }
                Err(e) => {
                    self.print_error(&format!("Input error: {}", e));
                    break;
                }
            }
        }

        self.print_dim("Goodbye!");
        Ok(())
    }

    /// Dispatch one command line.
    async fn handle_command(&mut self, input: &str) -> Result<ControlFlow> {
        let input = input.strip_prefix('/').unwrap_or(input);
        let (cmd, rest) = match input.split_once(char::is_whitespace) {
            Some((cmd, rest)) => (cmd, rest.trim()),
            None => (input, ""),
        };
        let args: Vec<&str> = rest.split_whitespace().collect();

        match cmd {
            "quit" | "q" | "exit" => return Ok(ControlFlow::Exit),
            "help" | "h" | "?" => self.print_help(),
            "login" => self.login(args.first().copied()).await?,
            "logout" => {
                self.client.auth().logout().await;
                self.print_success("Logged out");
            }
            "whoami" => self.whoami()?,
            "refresh" => {
                if self.client.auth().silent_refresh().await {
                    self.print_success("Session refreshed");
                } else {
                    self.print_error("Refresh rejected; you have been logged out");
                }
            }
            "me" => {
                let user = self.client.auth().fetch_current_user().await.map_err(report)?;
                self.print_value(&serde_json::to_value(&user)?)?;
            }
            "can" => {
                let [permission] = args[..] else {
                    bail!("usage: can <resource:action>");
                };
                self.print_answer(self.client.auth().has_permission(permission));
            }
            "role" => {
                let [role] = args[..] else {
                    bail!("usage: role <role>");
                };
                self.print_answer(self.client.auth().has_role(role));
            }
            "sso" => {
                let [provider] = args[..] else {
                    bail!("usage: sso <provider>");
                };
                self.sso(provider).await?;
            }
            "callback" => {
                let [code, state] = args[..] else {
                    bail!("usage: callback <code> <state>");
                };
                let user = self
                    .client
                    .auth()
                    .handle_sso_callback(code, state)
                    .await
                    .map_err(report)?;
                self.print_success(&format!("Logged in as {}", user.display_name()));
            }
            "register" => {
                let [username, email] = args[..] else {
                    bail!("usage: register <username> <email>");
                };
                self.register(username, email).await?;
            }
            "get" | "delete" => {
                let [path] = args[..] else {
                    bail!("usage: {} <path>", cmd);
                };
                if cmd == "get" {
                    let value: Value = self.client.get(path).await.map_err(report)?;
                    self.print_value(&value)?;
                } else {
                    self.client.delete(path).await.map_err(report)?;
                    self.print_success("Deleted");
                }
            }
            "post" | "put" | "patch" => {
                let Some((path, body)) = rest.split_once(char::is_whitespace) else {
                    bail!("usage: {} <path> <json>", cmd);
                };
                let body: Value = serde_json::from_str(body.trim())?;
                let value: Value = match cmd {
                    "post" => self.client.post(path, &body).await,
                    "put" => self.client.put(path, &body).await,
                    _ => self.client.patch(path, &body).await,
                }
                .map_err(report)?;
                self.print_value(&value)?;
            }
            "errors" => self.print_errors()?,
            _ => {
                self.print_error(&format!("Unknown command: {}", cmd));
                self.print_dim("Type help for available commands");
            }
        }

        Ok(ControlFlow::Continue)
    }

    /// Log in, prompting for whatever was not given.
    pub async fn login(&mut self, username: Option<&str>) -> Result<()> {
        let username = match username {
            Some(name) => name.to_string(),
            None => self.editor.readline("Username: ")?.trim().to_string(),
        };
        if username.is_empty() {
            bail!("username is required");
        }
        let password = rpassword::prompt_password("Password: ")?;

        let user = self
            .client
            .auth()
            .login(&LoginCredentials::new(username, password))
            .await
            .map_err(report)?;
        self.print_success(&format!("Logged in as {}", user.display_name()));
        Ok(())
    }

    async fn register(&mut self, username: &str, email: &str) -> Result<()> {
        let password = rpassword::prompt_password("Password: ")?;
        let confirm = rpassword::prompt_password("Confirm password: ")?;
        if password != confirm {
            bail!("passwords do not match");
        }

        self.client
            .auth()
            .register(&RegisterRequest {
                username: username.to_string(),
                email: email.to_string(),
                password,
            })
            .await
            .map_err(report)?;
        self.print_success(&format!("Account {} created; log in to continue", username));
        Ok(())
    }

    async fn sso(&self, provider: &str) -> Result<()> {
        if !self.providers.iter().any(|p| p == provider) {
            bail!(
                "unknown SSO provider '{}' (enabled: {})",
                provider,
                self.providers.join(", ")
            );
        }

        let redirect = self
            .client
            .auth()
            .initiate_sso_login(provider)
            .await
            .map_err(report)?;

        if self.json {
            let out = serde_json::json!({ "url": redirect.url, "state": redirect.state });
            println!("{}", serde_json::to_string_pretty(&out)?);
        } else {
            println!("Open this URL to sign in:");
            println!("  {}", style(&redirect.url).underlined());
            self.print_dim(&format!(
                "Then run: callback <code> {}",
                redirect.state
            ));
        }
        Ok(())
    }

    fn whoami(&self) -> Result<()> {
        match self.client.auth().current_user() {
            Some(user) if self.json => {
                println!("{}", serde_json::to_string_pretty(&user)?);
            }
            Some(user) => {
                let dim = Style::new().dim();
                println!("{} <{}>", style(user.display_name()).bold(), user.email);
                println!("  {} {}", dim.apply_to("id:"), user.id);
                println!("  {} {}", dim.apply_to("roles:"), user.roles.join(", "));
                if self.verbose {
                    println!(
                        "  {} {}",
                        dim.apply_to("idle timer:"),
                        if self.client.idle_timer_active() {
                            "armed"
                        } else {
                            "off"
                        }
                    );
                }
            }
            None => self.print_dim("Not logged in"),
        }
        Ok(())
    }

    fn print_errors(&self) -> Result<()> {
        let errors = self.client.errors().recent();
        if self.json {
            println!("{}", serde_json::to_string_pretty(&errors)?);
            return Ok(());
        }
        if errors.is_empty() {
            self.print_dim("No errors recorded");
            return Ok(());
        }

        let dim = Style::new().dim();
        for event in &errors {
            let status = event
                .status
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string());
            println!(
                "{} [{}] {} {}",
                dim.apply_to(event.timestamp.format("%H:%M:%S")),
                status,
                event.operation.as_deref().unwrap_or(""),
                event.message
            );
        }
        Ok(())
    }

    fn print_welcome(&self) {
        let dim = Style::new().dim();
        println!();
        println!("{}", style("ruffed console").bold().cyan());
        println!("{}", dim.apply_to("─".repeat(40)));
        println!("{}", dim.apply_to(self.client.base_url().as_str()));
        println!("{}", dim.apply_to("Type help for commands, Ctrl+D to exit."));
        println!();
    }

    fn print_help(&self) {
        let dim = Style::new().dim();
        let commands = [
            ("login [user]", "Log in with username and password"),
            ("logout", "End the session"),
            ("whoami", "Show the current user"),
            ("refresh", "Refresh the session now"),
            ("me", "Reload the current user from the server"),
            ("can <perm>", "Check a resource:action permission"),
            ("role <role>", "Check a role"),
            ("sso <provider>", "Start a single sign-on login"),
            ("callback <code> <state>", "Finish a single sign-on login"),
            ("register <user> <email>", "Create an account"),
            ("get|delete <path>", "Call an API endpoint"),
            ("post|put|patch <path> <json>", "Call an API endpoint with a body"),
            ("errors", "Show recorded request failures"),
            ("quit", "Exit the console"),
        ];

        println!();
        println!("{}", style("Available Commands").bold());
        println!("{}", dim.apply_to("─".repeat(40)));
        for (usage, about) in commands {
            println!("  {:<30} {}", style(usage).cyan(), about);
        }
        println!();
        println!("{}", dim.apply_to("Keyboard shortcuts:"));
        println!("  {} - Interrupt current input", dim.apply_to("Ctrl+C"));
        println!("  {} - Exit the console", dim.apply_to("Ctrl+D"));
        println!();
    }

    fn format_prompt(&self) -> String {
        match self.client.auth().current_user() {
            Some(user) => format!("{} ", style(format!("ruffed({})>", user.username)).cyan().bold()),
            None => format!("{} ", style("ruffed>").cyan().bold()),
        }
    }

    fn print_value(&self, value: &Value) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string(value)?);
        } else {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
        Ok(())
    }

    fn print_answer(&self, yes: bool) {
        if yes {
            println!("{}", Style::new().green().apply_to("yes"));
        } else {
            println!("{}", Style::new().red().apply_to("no"));
        }
    }

    fn print_dim(&self, msg: &str) {
        let dim = Style::new().dim();
        println!("{}", dim.apply_to(msg));
    }

    fn print_success(&self, msg: &str) {
        let green = Style::new().green();
        println!("{} {}", green.apply_to("✓"), msg);
    }

    fn print_error(&self, msg: &str) {
        let red = Style::new().red();
        println!("{} {}", red.apply_to("Error:"), msg);
    }
}

/// Turn a client failure into the message shown to the user.
fn report(e: ClientError) -> anyhow::Error {
    tracing::debug!(error = %e, "Command failed");
    anyhow::anyhow!(e.user_message())
}

/// Control flow for the REPL.
pub enum ControlFlow {
    Continue,
    Exit,
}
