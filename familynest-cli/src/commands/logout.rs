//! Logout command
//!
//! Clears the persisted session without restoring it first, so logging out
//! never waits on the account service.

use std::path::Path;

use anyhow::Result;
use familynest_core::ports::{keys, KeyValueStore};

use super::{get_app_dir, open_context};
use crate::output;

/// Forget the session stored in `app_dir`. Returns whether one was there.
fn logout_in(app_dir: &Path) -> Result<bool> {
    let mut ctx = open_context(app_dir)?;
    let had_session = ctx.store.get(keys::TOKEN)?.is_some() || ctx.store.get(keys::USER)?.is_some();
    ctx.session.logout();
    Ok(had_session)
}

pub fn run() -> Result<()> {
    if logout_in(&get_app_dir()?)? {
        output::success("Logged out");
    } else {
        output::info("Not logged in");
    }
    Ok(())
}
