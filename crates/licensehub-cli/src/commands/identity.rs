//! Identity management CLI commands.

use clap::{Args, Subcommand};
use dialoguer::Password;

use super::Context;
use crate::output;
use licensehub_auth::RegisterIdentity;
use licensehub_core::error::AppError;

/// Arguments for identity commands
#[derive(Debug, Args)]
pub struct IdentityArgs {
    /// Identity subcommand
    #[command(subcommand)]
    pub command: IdentityCommand,
}

/// Identity subcommands
#[derive(Debug, Subcommand)]
pub enum IdentityCommand {
    /// Register a new identity with the default roles
    Create {
        /// Unique username
        #[arg(short, long)]
        username: String,
        /// Unique email address
        #[arg(short, long)]
        email: String,
        /// Display name
        #[arg(long, default_value = "")]
        full_name: String,
    },
    /// Log in and print a session token
    Login {
        /// Username
        #[arg(short, long)]
        username: String,
    },
}

fn prompt_password(prompt: &str, confirm: bool) -> Result<String, AppError> {
    let mut input = Password::new().with_prompt(prompt);
    if confirm {
        input = input.with_confirmation("Confirm password", "Passwords do not match");
    }
    input
        .interact()
        .map_err(|e| AppError::validation(format!("Input error: {}", e)))
}

/// Execute identity commands
pub async fn execute(args: &IdentityArgs, ctx: &Context) -> Result<(), AppError> {
    match &args.command {
        IdentityCommand::Create {
            username,
            email,
            full_name,
        } => {
            let password = prompt_password("Password", true)?;
            let identity = ctx
                .hub
                .sessions
                .register(RegisterIdentity {
                    username: username.clone(),
                    email: email.clone(),
                    full_name: full_name.clone(),
                    password,
                })
                .await?;

            output::print_success(&format!("Identity '{}' created", identity.username));
            output::print_kv("ID", &identity.id.to_string());
        }
        IdentityCommand::Login { username } => {
            let password = prompt_password("Password", false)?;
            let login = ctx.hub.sessions.login(username, &password).await?;

            output::print_success(&format!("Logged in as '{}'", login.identity.username));
            output::print_kv("Token", &login.token);
            output::print_kv("Expires", &login.session.expires_at.to_rfc3339());
        }
    }

    Ok(())
}
