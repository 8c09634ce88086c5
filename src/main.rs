use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use concordat::cli::commands::contract::{ActCommand, CreateCommand, DeleteCommand, ShowCommand};
use concordat::cli::commands::invitation::{AcceptCommand, InviteCommand};
use concordat::cli::commands::notifications::NotificationsCommand;
use concordat::cli::commands::seed::SeedCommand;
use concordat::cli::commands::{Command, CommandContext};
use concordat::cli::{Cli, Commands};
use concordat::{config, init_telemetry, shutdown_telemetry, workflow_metrics};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = config()?;
    init_telemetry(&config.observability)?;

    let workspace = cli
        .workspace
        .unwrap_or_else(|| PathBuf::from(&config.workspace.snapshot_path));
    let context = CommandContext::new(workspace, config.workflow.clone());

    let result = match cli.command {
        Commands::Seed { force } => SeedCommand::new(context, force).execute().await,
        Commands::Create { text, companies } => {
            CreateCommand::new(context, text, companies).execute().await
        }
        Commands::Act {
            contract,
            employee,
            action,
        } => ActCommand::new(context, contract, employee, action).execute().await,
        Commands::Show { contract, employee } => {
            ShowCommand::new(context, contract, employee).execute().await
        }
        Commands::Invite {
            contract,
            employee,
            invitation_type,
            company,
        } => {
            InviteCommand::new(context, contract, employee, invitation_type, company)
                .execute()
                .await
        }
        Commands::Accept { invitation } => AcceptCommand::new(context, invitation).execute().await,
        Commands::Delete { contract } => DeleteCommand::new(context, contract).execute().await,
        Commands::Notifications { employee } => {
            NotificationsCommand::new(context, employee).execute().await
        }
    };

    workflow_metrics().log_stats();
    shutdown_telemetry();
    result
}
