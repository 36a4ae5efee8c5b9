//! Logs command - inspect the session event log

use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, TimeZone, Utc};
use clap::Subcommand;
use colored::Colorize;
use familynest_core::{EventFilter, EventLog, RecordedEvent, SessionEvent};

use super::{get_app_dir, open_event_log};
use crate::output;

#[derive(Subcommand)]
pub enum LogsCommands {
    /// Show recent session events, newest first
    List {
        #[arg(short, long, default_value = "50")]
        limit: usize,
        /// Only this event, e.g. login_failed
        #[arg(long)]
        event: Option<SessionEvent>,
        /// Only events that carry an error
        #[arg(long, alias = "errors")]
        failures: bool,
        #[arg(long)]
        json: bool,
    },
    /// Count events per kind
    Stats {
        #[arg(long)]
        json: bool,
    },
    /// Delete events older than N days
    Clear {
        #[arg(long, default_value = "30")]
        older_than_days: u64,
        /// Skip confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
        #[arg(long)]
        json: bool,
    },
}

fn event_log() -> Result<EventLog> {
    open_event_log(&get_app_dir()?)
}

fn format_time(ms: i64) -> String {
    Utc.timestamp_millis_opt(ms)
        .single()
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| ms.to_string())
}

/// Unix ms of the moment `days` days before `now`
fn cutoff_ms(now: DateTime<Utc>, days: u64) -> Result<i64> {
    i64::try_from(days)
        .ok()
        .and_then(Duration::try_days)
        .and_then(|age| now.checked_sub_signed(age))
        .map(|cutoff| cutoff.timestamp_millis())
        .ok_or_else(|| anyhow!("--older-than-days {} is out of range", days))
}

fn print_events(events: &[RecordedEvent]) {
    let mut table = output::create_table();
    table.set_header(vec!["Time", "Event", "Backend", "Command", "Error"]);
    for e in events {
        let event = if e.is_failure() {
            e.event.red().to_string()
        } else {
            e.event.clone()
        };
        table.add_row(vec![
            format_time(e.recorded_at),
            event,
            e.backend.clone().unwrap_or_default(),
            e.command.clone().unwrap_or_default(),
            e.error_message.clone().unwrap_or_default(),
        ]);
    }
    println!("{}", table);
}

pub fn run(command: LogsCommands) -> Result<()> {
    match command {
        LogsCommands::List {
            limit,
            event,
            failures,
            json,
        } => {
            let mut filter = EventFilter::latest(limit);
            if let Some(event) = event {
                filter = filter.only(event);
            }
            if failures {
                filter = filter.failures();
            }
            let events = event_log()?.recent(&filter)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&events)?);
            } else if events.is_empty() {
                output::info("No matching events");
            } else {
                print_events(&events);
            }
        }
        LogsCommands::Stats { json } => {
            let log = event_log()?;
            let counts = log.counts()?;
            let size_bytes = std::fs::metadata(log.path()).map(|m| m.len()).unwrap_or(0);

            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "events": counts,
                        "database_path": log.path(),
                        "database_size_bytes": size_bytes,
                    }))?
                );
                return Ok(());
            }

            if counts.is_empty() {
                output::info("No events recorded");
            } else {
                let mut table = output::create_table();
                table.set_header(vec!["Event", "Count", "Failures", "Last seen"]);
                for c in &counts {
                    table.add_row(vec![
                        c.event.clone(),
                        c.total.to_string(),
                        c.failures.to_string(),
                        format_time(c.last_recorded_at),
                    ]);
                }
                println!("{}", table);
            }
            println!("{} {} ({} bytes)", "Database:".dimmed(), log.path().display(), size_bytes);
        }
        LogsCommands::Clear {
            older_than_days,
            force,
            json,
        } => {
            let cutoff = cutoff_ms(Utc::now(), older_than_days)?;

            if !force && !json {
                let confirmed = dialoguer::Confirm::new()
                    .with_prompt(format!("Delete events older than {} days?", older_than_days))
                    .default(false)
                    .interact()?;
                if !confirmed {
                    output::info("Cancelled");
                    return Ok(());
                }
            }

            let deleted = event_log()?.prune_before(cutoff)?;
            if json {
                println!("{}", serde_json::json!({ "deleted": deleted }));
            } else {
                output::success(&format!("Deleted {} events", deleted));
            }
        }
    }

    Ok(())
}
