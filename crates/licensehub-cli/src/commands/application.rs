//! Application management CLI commands.

use clap::{Args, Subcommand};

use super::Context;
use crate::output;
use licensehub_core::error::AppError;

/// Arguments for application commands
#[derive(Debug, Args)]
pub struct ApplicationArgs {
    /// Application subcommand
    #[command(subcommand)]
    pub command: ApplicationCommand,
}

/// Application subcommands
#[derive(Debug, Subcommand)]
pub enum ApplicationCommand {
    /// Register an application owned by the caller
    Create {
        /// Product name
        #[arg(short, long)]
        name: String,
        /// Product version
        #[arg(short, long, default_value = "1.0")]
        version: String,
    },
}

/// Execute application commands
pub async fn execute(args: &ApplicationArgs, ctx: &Context) -> Result<(), AppError> {
    let principal = ctx.principal().await?;

    match &args.command {
        ApplicationCommand::Create { name, version } => {
            let application = ctx
                .hub
                .applications
                .register(&principal, name, version)
                .await?;
            output::print_item(&application, ctx.format);
        }
    }

    Ok(())
}
