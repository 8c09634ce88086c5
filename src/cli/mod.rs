use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::approval::{Action, InvitationType};

pub mod commands;

#[derive(Parser)]
#[command(name = "concordat")]
#[command(about = "Multi-company contract approval workflow")]
#[command(long_about = "Concordat walks a contract shared by several companies through drafting, \
                       harmonization, signing and archival. Every command works on a local JSON workspace; \
                       start with 'concordat seed' to get a two-company demo.")]
pub struct Cli {
    /// Workspace snapshot to operate on
    #[arg(long, global = true, help = "Path of the workspace JSON file (defaults to the configured snapshot_path)")]
    pub workspace: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a demo workspace with two companies and their staff
    Seed {
        /// Replace an existing workspace
        #[arg(long, help = "Overwrite the workspace even if it already has data")]
        force: bool,
    },
    /// Create a contract between companies
    Create {
        /// Contract text
        #[arg(long)]
        text: String,
        /// Participating company ids
        #[arg(long = "company", required = true, num_args = 1.., help = "Company id; repeat for each participant")]
        companies: Vec<String>,
    },
    /// Request an action on a contract as an employee
    Act {
        #[arg(long)]
        contract: String,
        #[arg(long)]
        employee: String,
        /// harmonize, sign or archive
        #[arg(long)]
        action: Action,
    },
    /// Show a contract as one employee sees it
    Show {
        #[arg(long)]
        contract: String,
        #[arg(long)]
        employee: String,
    },
    /// Invite another company's staff to collaborate
    Invite {
        #[arg(long)]
        contract: String,
        /// Employee sending the invitation
        #[arg(long)]
        employee: String,
        /// editing, harmonization or signing
        #[arg(long = "type")]
        invitation_type: InvitationType,
        /// Company receiving the invitation
        #[arg(long)]
        company: String,
    },
    /// Accept an invitation
    Accept {
        #[arg(long)]
        invitation: String,
    },
    /// Delete a contract with its invitations and comments
    Delete {
        #[arg(long)]
        contract: String,
    },
    /// List notifications delivered to an employee
    Notifications {
        #[arg(long)]
        employee: String,
    },
}
