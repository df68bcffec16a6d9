//! License management CLI commands.

use chrono::{Duration, Utc};
use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;
use uuid::Uuid;

use super::Context;
use crate::output;
use licensehub_core::error::AppError;
use licensehub_entity::activation::Activation;
use licensehub_entity::license::{FeatureSet, FeatureValue, License};
use licensehub_service::CreateLicenseRequest;

/// Arguments for license commands
#[derive(Debug, Args)]
pub struct LicenseArgs {
    /// License subcommand
    #[command(subcommand)]
    pub command: LicenseCommand,
}

/// License subcommands
#[derive(Debug, Subcommand)]
pub enum LicenseCommand {
    /// Create a license and print its key once
    Create {
        /// Owning application
        #[arg(short, long)]
        application: Uuid,
        /// Activation ceiling
        #[arg(short, long)]
        max_activations: Option<i32>,
        /// Days until the license expires
        #[arg(long)]
        expires_in_days: Option<i64>,
        /// Enabled feature, repeatable
        #[arg(long = "feature")]
        features: Vec<String>,
        /// Free-form notes
        #[arg(long)]
        notes: Option<String>,
    },
    /// List the licenses of an application
    List {
        /// Owning application
        #[arg(short, long)]
        application: Uuid,
    },
    /// Look up a license by its key
    Show {
        /// License key
        key: String,
    },
    /// Delete a license with its activations and offline codes
    Delete {
        /// License ID
        id: Uuid,
        /// Skip confirmation
        #[arg(short, long)]
        force: bool,
    },
    /// List activations on every license you own
    Activations,
    /// Release an activation slot
    Deactivate {
        /// Activation ID
        id: Uuid,
    },
    /// Block an active license
    Block {
        /// License ID
        id: Uuid,
    },
    /// Restore a blocked license
    Unblock {
        /// License ID
        id: Uuid,
    },
    /// Validate a key for a machine, claiming a slot when valid
    Validate {
        /// License key
        key: String,
        /// Machine fingerprint
        #[arg(short, long)]
        fingerprint: String,
    },
}

/// License display row for table output
#[derive(Debug, Serialize, Tabled)]
struct LicenseRow {
    /// License ID
    id: String,
    /// Status
    status: String,
    /// Activations in use
    activations: String,
    /// Expiry
    expires_at: String,
    /// Created at
    created_at: String,
}

impl From<&License> for LicenseRow {
    fn from(license: &License) -> Self {
        Self {
            id: license.id.to_string(),
            status: license.status.to_string(),
            activations: format!(
                "{}/{}",
                license.activation_count, license.max_activations
            ),
            expires_at: license
                .expires_at
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "never".to_string()),
            created_at: license.created_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

/// Activation display row
#[derive(Debug, Serialize, Tabled)]
struct ActivationRow {
    /// Activation ID
    id: String,
    /// License ID
    license_id: String,
    /// Machine
    machine: String,
    /// Last heartbeat
    last_heartbeat: String,
}

impl From<&Activation> for ActivationRow {
    fn from(activation: &Activation) -> Self {
        Self {
            id: activation.id.to_string(),
            license_id: activation.license_id.to_string(),
            machine: activation
                .machine_name
                .clone()
                .unwrap_or_else(|| activation.machine_fingerprint.clone()),
            last_heartbeat: activation
                .last_heartbeat
                .format("%Y-%m-%d %H:%M")
                .to_string(),
        }
    }
}

/// Execute license commands
pub async fn execute(args: &LicenseArgs, ctx: &Context) -> Result<(), AppError> {
    match &args.command {
        LicenseCommand::Create {
            application,
            max_activations,
            expires_in_days,
            features,
            notes,
        } => {
            let principal = ctx.principal().await?;
            let mut feature_set = FeatureSet::new();
            for name in features {
                feature_set.insert(name.clone(), FeatureValue::Flag(true));
            }
            let issued = ctx
                .hub
                .licenses
                .create(
                    &principal,
                    CreateLicenseRequest {
                        application_id: *application,
                        customer_id: None,
                        expires_at: expires_in_days.map(|d| Utc::now() + Duration::days(d)),
                        max_activations: *max_activations,
                        features: feature_set,
                        notes: notes.clone(),
                    },
                )
                .await?;

            output::print_success("License created");
            output::print_kv("ID", &issued.license.id.to_string());
            output::print_kv("Key", &issued.key);
            output::print_warning("The key is shown only once. Store it now.");
        }
        LicenseCommand::List { application } => {
            let principal = ctx.principal().await?;
            let licenses = ctx
                .hub
                .licenses
                .list_by_application(&principal, *application)
                .await?;
            let rows: Vec<LicenseRow> = licenses.iter().map(LicenseRow::from).collect();
            output::print_list(&rows, ctx.format);
        }
        LicenseCommand::Show { key } => {
            let principal = ctx.principal().await?;
            let license = ctx.hub.licenses.get_by_key(&principal, key).await?;
            output::print_item(&license, ctx.format);
        }
        LicenseCommand::Delete { id, force } => {
            let principal = ctx.principal().await?;
            if !force {
                let confirm = dialoguer::Confirm::new()
                    .with_prompt(format!("Delete license {id} and all of its activations?"))
                    .default(false)
                    .interact()
                    .map_err(|e| AppError::internal(format!("Input error: {}", e)))?;

                if !confirm {
                    println!("Cancelled.");
                    return Ok(());
                }
            }
            ctx.hub.licenses.delete(&principal, *id).await?;
            output::print_success(&format!("License {} deleted", id));
        }
        LicenseCommand::Activations => {
            let principal = ctx.principal().await?;
            let activations = ctx.hub.activations.list_for_owner(&principal).await?;
            let rows: Vec<ActivationRow> = activations.iter().map(ActivationRow::from).collect();
            output::print_list(&rows, ctx.format);
        }
        LicenseCommand::Deactivate { id } => {
            let principal = ctx.principal().await?;
            if ctx.hub.deactivate(&principal, *id).await? {
                output::print_success(&format!("Activation {} released", id));
            } else {
                output::print_warning(&format!("Activation {} not found", id));
            }
        }
        LicenseCommand::Block { id } => {
            let principal = ctx.principal().await?;
            ctx.hub.licenses.block(&principal, *id).await?;
            output::print_success(&format!("License {} blocked", id));
        }
        LicenseCommand::Unblock { id } => {
            let principal = ctx.principal().await?;
            ctx.hub.licenses.unblock(&principal, *id).await?;
            output::print_success(&format!("License {} unblocked", id));
        }
        LicenseCommand::Validate { key, fingerprint } => {
            let result = ctx.hub.validate_license(key, fingerprint, None).await?;
            if result.valid {
                output::print_success(&result.message);
            } else {
                output::print_warning(&result.message);
            }
            output::print_item(&result, ctx.format);
        }
    }

    Ok(())
}
