//! CLI command implementations

pub mod login;
pub mod logout;
pub mod logs;
pub mod mock;
pub mod register;
pub mod select;
pub mod status;
pub mod transactions;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use familynest_core::{EntryPoint, EventLog, FamilyNestContext, LogEvent};

/// Open the event log in `app_dir`
pub fn open_event_log(app_dir: &Path) -> Result<EventLog> {
    std::fs::create_dir_all(app_dir)?;
    EventLog::open(app_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION"))
}

/// Record an event; a missing or broken log never fails the command
pub fn record_event(event: LogEvent) {
    let recorded = get_app_dir().and_then(|dir| open_event_log(&dir)?.record(event));
    if let Err(e) = recorded {
        tracing::debug!(error = %e, "Could not record event");
    }
}

/// Get the FamilyNest directory from environment or default
pub fn get_app_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("FAMILYNEST_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".familynest"))
        .ok_or_else(|| anyhow!("Could not find home directory; set FAMILYNEST_DIR"))
}

/// Build the context without touching the network.
///
/// The session starts unauthenticated; persisted values are still in the store.
pub fn open_context(app_dir: &Path) -> Result<FamilyNestContext> {
    std::fs::create_dir_all(app_dir)
        .with_context(|| format!("Failed to create FamilyNest directory: {:?}", app_dir))?;

    tracing::debug!(app_dir = ?app_dir, "Opening FamilyNest directory");
    let mut ctx = FamilyNestContext::new(app_dir)
        .context("Failed to initialize FamilyNest context")?;
    match open_event_log(app_dir) {
        Ok(log) => ctx = ctx.with_event_log(Arc::new(log)),
        Err(e) => tracing::debug!(error = %e, "Event log unavailable"),
    }
    Ok(ctx)
}

/// Build the context and restore any persisted session
pub async fn get_context() -> Result<FamilyNestContext> {
    let mut ctx = open_context(&get_app_dir()?)?;
    ctx.session.restore().await;
    Ok(ctx)
}
