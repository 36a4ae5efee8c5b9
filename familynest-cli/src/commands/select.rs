//! Select command - choose the active account

use anyhow::Result;

use super::get_context;
use crate::output;

pub async fn run(account_id: &str) -> Result<()> {
    let mut ctx = get_context().await?;
    if ctx.session.session().user().is_none() {
        output::warning("Not logged in. Run 'nest login' first.");
        return Ok(());
    }

    if ctx.session.select_account(account_id) {
        if let Some(account) = ctx.session.session().selected_account() {
            output::success(&format!("Selected {}", output::account_line(account)));
        }
    } else {
        output::warning(&format!(
            "No account with id {}; selection unchanged. Run 'nest status' to list accounts.",
            account_id
        ));
    }
    Ok(())
}
