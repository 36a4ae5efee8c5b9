//! FamilyNest CLI - family finance sessions in your terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use familynest_core::{LogEvent, Role, SessionEvent};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{login, logout, logs, mock, register, select, status, transactions};

/// FamilyNest - family finance in your terminal
#[derive(Parser)]
#[command(name = "nest", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and load your accounts
    Login {
        #[arg(short, long)]
        username: Option<String>,
        /// Prompted for when omitted
        #[arg(short, long, env = "FAMILYNEST_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Register a new family member and log in
    Register {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        email: String,
        /// Prompted for when omitted
        #[arg(short, long)]
        password: Option<String>,
        /// parent or child
        #[arg(long)]
        role: Role,
        /// Parent user ID (required for children)
        #[arg(long)]
        parent_id: Option<String>,
    },

    /// Forget the current session
    Logout,

    /// Show the signed-in user and their accounts
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Select the active account
    Select {
        /// Account ID
        account_id: String,
    },

    /// List transactions on the selected account
    Transactions {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Switch to the offline mock account service
    Mock {
        #[command(subcommand)]
        command: Option<mock::MockCommands>,
    },

    /// View and manage the session event log
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Login { .. } => "login",
            Commands::Register { .. } => "register",
            Commands::Logout => "logout",
            Commands::Status { .. } => "status",
            Commands::Select { .. } => "select",
            Commands::Transactions { .. } => "transactions",
            Commands::Mock { .. } => "mock",
            Commands::Logs { .. } => "logs",
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Diagnostics go to stderr; stdout is reserved for command output
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("FAMILYNEST_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let command_name = cli.command.name();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            commands::record_event(
                LogEvent::new(SessionEvent::CommandFailed)
                    .with_command(command_name)
                    .with_error(e.to_string()),
            );
            output::error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Login { username, password } => login::run(username, password).await,
        Commands::Register { username, email, password, role, parent_id } => {
            register::run(username, email, password, role, parent_id).await
        }
        Commands::Logout => logout::run(),
        Commands::Status { json } => status::run(json).await,
        Commands::Select { account_id } => select::run(&account_id).await,
        Commands::Transactions { json } => transactions::run(json).await,
        Commands::Mock { command } => mock::run(command),
        Commands::Logs { command } => logs::run(command),
    }
}
