//! CLI command definitions and dispatch.

pub mod application;
pub mod identity;
pub mod license;
pub mod migrate;
pub mod offline;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;
use licensehub::LicenseHub;
use licensehub_auth::Principal;
use licensehub_core::config::AppConfig;
use licensehub_core::error::AppError;

/// LicenseHub: credential verification and license activation
#[derive(Debug, Parser)]
#[command(name = "licensehub", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Bearer credential for commands that act on behalf of an identity
    #[arg(long, env = "LICENSEHUB_TOKEN", hide_env_values = true, global = true)]
    pub token: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Database migration management
    Migrate(migrate::MigrateArgs),
    /// Identity management
    Identity(identity::IdentityArgs),
    /// Application management
    Application(application::ApplicationArgs),
    /// License management and validation
    License(license::LicenseArgs),
    /// Offline activation exchange
    Offline(offline::OfflineArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self, config: AppConfig) -> Result<(), AppError> {
        if let Commands::Migrate(args) = &self.command {
            return migrate::execute(args, &config).await;
        }

        let hub = LicenseHub::connect(config).await?;
        let ctx = Context {
            hub,
            format: self.format,
            token: self.token.clone(),
        };
        match &self.command {
            Commands::Migrate(_) => Ok(()),
            Commands::Identity(args) => identity::execute(args, &ctx).await,
            Commands::Application(args) => application::execute(args, &ctx).await,
            Commands::License(args) => license::execute(args, &ctx).await,
            Commands::Offline(args) => offline::execute(args, &ctx).await,
        }
    }
}

/// State shared by every command that talks to the hub
pub struct Context {
    /// Connected hub
    pub hub: LicenseHub,
    /// Output format
    pub format: OutputFormat,
    /// Bearer credential from `--token`
    pub token: Option<String>,
}

impl Context {
    /// Authenticate the configured bearer credential
    pub async fn principal(&self) -> Result<Principal, AppError> {
        if self.token.is_none() {
            return Err(AppError::validation(
                "This command requires --token or LICENSEHUB_TOKEN",
            ));
        }
        self.hub.authenticate(self.token.as_deref()).await
    }
}

/// Helper: load configuration from file
pub fn load_config(config_path: &str) -> Result<AppConfig, AppError> {
    AppConfig::load(config_path)
}
