//! Login command - authenticate and load accounts

use anyhow::Result;
use dialoguer::{Input, Password};

use super::get_context;
use crate::output;

/// Prompt for whatever the user didn't pass on the command line
fn prompt_credentials(username: Option<String>, password: Option<String>) -> Result<(String, String)> {
    let username = match username {
        Some(u) => u,
        None => Input::new().with_prompt("Username").interact_text()?,
    };
    let password = match password {
        Some(p) => p,
        None => Password::new().with_prompt("Password").interact()?,
    };
    Ok((username, password))
}

pub async fn run(username: Option<String>, password: Option<String>) -> Result<()> {
    let (username, password) = prompt_credentials(username, password)?;
    let mut ctx = get_context().await?;

    let pb = output::spinner("Signing in...");
    let result = ctx.session.login(&username, &password).await;
    pb.finish_and_clear();
    result?;

    output::success("Logged in");
    output::signed_in_summary(ctx.session.session());
    Ok(())
}
