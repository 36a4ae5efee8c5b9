//! Mock command - switch between the HTTP API and the offline mock service

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use familynest_core::adapters::mock::DEMO_PASSWORD;
use familynest_core::config::Config;

use super::get_app_dir;

#[derive(Subcommand)]
pub enum MockCommands {
    /// Use the in-memory mock service
    #[command(name = "on")]
    On,
    /// Use the HTTP account service
    #[command(name = "off")]
    Off,
    /// Show which backend is configured
    Status,
}

pub fn run(command: Option<MockCommands>) -> Result<()> {
    let app_dir = get_app_dir()?;
    std::fs::create_dir_all(&app_dir)?;
    let mut config = Config::load(&app_dir)?;

    match command {
        Some(MockCommands::On) => {
            config.enable_mock_mode();
            config.save(&app_dir)?;
            println!("{}", "Mock mode enabled".green());
            println!(
                "Log in as 'parent' or 'child' with password '{}'. Run 'nest login' to start.",
                DEMO_PASSWORD
            );
        }
        Some(MockCommands::Off) => {
            config.disable_mock_mode();
            config.save(&app_dir)?;
            println!("{}", "Mock mode disabled".yellow());
            println!("Using account service at {}", config.api_base_url);
        }
        Some(MockCommands::Status) | None => {
            if config.mock_mode {
                println!("Mock mode is {}", "ON".green());
            } else {
                println!("Mock mode is {}", "OFF".yellow());
                println!("Account service: {}", config.api_base_url);
            }
        }
    }
    Ok(())
}
