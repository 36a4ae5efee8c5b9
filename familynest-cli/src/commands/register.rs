//! Register command - create a user and sign in

use anyhow::{bail, Result};
use dialoguer::Password;
use familynest_core::Role;

use super::get_context;
use crate::output;

pub async fn run(
    username: String,
    email: String,
    password: Option<String>,
    role: Role,
    parent_id: Option<String>,
) -> Result<()> {
    if role == Role::Child && parent_id.as_deref().map_or(true, |p| p.trim().is_empty()) {
        bail!("Parent ID is required for child accounts (use --parent-id)");
    }

    let password = match password {
        Some(p) => p,
        None => Password::new()
            .with_prompt("Password")
            .with_confirmation("Confirm password", "Passwords do not match")
            .interact()?,
    };

    let mut ctx = get_context().await?;

    let pb = output::spinner("Creating account...");
    let result = ctx
        .session
        .register(&username, &email, &password, role, parent_id.as_deref())
        .await;
    pb.finish_and_clear();
    result?;

    output::success(&format!("Registered {} as a {}", username, role));
    output::signed_in_summary(ctx.session.session());
    Ok(())
}
