//! Offline activation exchange CLI commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;
use uuid::Uuid;

use super::Context;
use crate::output;
use licensehub_core::error::AppError;
use licensehub_entity::offline::ActivationRequestForm;

/// Arguments for offline commands
#[derive(Debug, Args)]
pub struct OfflineArgs {
    /// Offline subcommand
    #[command(subcommand)]
    pub command: OfflineCommand,
}

/// Offline subcommands
#[derive(Debug, Subcommand)]
pub enum OfflineCommand {
    /// Generate single-use activation codes for a license
    Codes {
        /// License ID
        #[arg(short, long)]
        license: Uuid,
        /// Number of codes
        #[arg(short, long, default_value = "1")]
        quantity: usize,
        /// Restrict the codes to one machine fingerprint
        #[arg(long)]
        pin: Option<String>,
    },
    /// Open an activation request for an offline machine
    Request {
        /// License key
        key: String,
        /// Machine fingerprint
        #[arg(short, long)]
        fingerprint: String,
        /// Machine display name
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Redeem an activation code against a request
    Complete {
        /// Request code
        request_code: String,
        /// Activation code
        activation_code: String,
    },
    /// Show an activation request
    Show {
        /// Request code
        request_code: String,
    },
    /// List activation requests on licenses you own
    Requests,
}

/// Activation code display row
#[derive(Debug, Serialize, Tabled)]
struct CodeRow {
    /// Code
    code: String,
    /// Expiry
    expires_at: String,
}

/// Activation request display row
#[derive(Debug, Serialize, Tabled)]
struct RequestRow {
    /// Request ID
    id: String,
    /// Request code
    request_code: String,
    /// Machine fingerprint
    machine: String,
    /// Status
    status: String,
    /// Expiry
    expires_at: String,
}

impl From<&ActivationRequestForm> for RequestRow {
    fn from(form: &ActivationRequestForm) -> Self {
        Self {
            id: form.id.to_string(),
            request_code: form.request_code.clone(),
            machine: form.machine_fingerprint.clone(),
            status: form.status.to_string(),
            expires_at: form.expires_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

/// Execute offline commands
pub async fn execute(args: &OfflineArgs, ctx: &Context) -> Result<(), AppError> {
    match &args.command {
        OfflineCommand::Codes {
            license,
            quantity,
            pin,
        } => {
            let principal = ctx.principal().await?;
            let codes = ctx
                .hub
                .generate_offline_codes(&principal, *license, pin.as_deref(), *quantity)
                .await?;
            let rows: Vec<CodeRow> = codes
                .into_iter()
                .map(|c| CodeRow {
                    code: c.code,
                    expires_at: c.expires_at.format("%Y-%m-%d %H:%M").to_string(),
                })
                .collect();
            output::print_list(&rows, ctx.format);
        }
        OfflineCommand::Request {
            key,
            fingerprint,
            name,
        } => {
            let ticket = ctx
                .hub
                .create_offline_request(key, fingerprint, name.as_deref())
                .await?;
            output::print_success("Activation request created");
            output::print_item(&ticket, ctx.format);
        }
        OfflineCommand::Complete {
            request_code,
            activation_code,
        } => {
            let completed = ctx
                .hub
                .complete_offline_request(request_code, activation_code)
                .await?;
            output::print_success("Activation completed");
            output::print_item(&completed, ctx.format);
        }
        OfflineCommand::Show { request_code } => {
            let form = ctx.hub.offline.get_request(request_code).await?;
            output::print_item(&form, ctx.format);
        }
        OfflineCommand::Requests => {
            let principal = ctx.principal().await?;
            let forms = ctx.hub.offline.list_requests(&principal).await?;
            let rows: Vec<RequestRow> = forms.iter().map(RequestRow::from).collect();
            output::print_list(&rows, ctx.format);
        }
    }

    Ok(())
}
