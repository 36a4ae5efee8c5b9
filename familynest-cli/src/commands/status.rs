//! Status command - show the signed-in user and their accounts

use std::collections::HashMap;

use anyhow::Result;
use colored::Colorize;
use familynest_core::OperationResult;

use super::get_context;
use crate::output;

pub async fn run(json: bool) -> Result<()> {
    let ctx = get_context().await?;
    let session = ctx.session.session();

    if json {
        let context = HashMap::from([(
            "backend".to_string(),
            serde_json::Value::from(ctx.session.backend_name()),
        )]);
        let result = OperationResult::ok_with_context(session, context);
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("{}", "FamilyNest Status".bold());
    println!();
    println!("Backend: {}", ctx.session.backend_name());

    let Some(user) = session.user() else {
        output::warning("Not logged in. Run 'nest login' to sign in.");
        return Ok(());
    };
    println!("User: {} <{}> ({})", user.username.bold(), user.email, user.role);
    println!();

    if session.accounts().is_empty() {
        output::warning("No accounts available");
        return Ok(());
    }

    let selected = session.selected_account_id();
    let mut table = output::create_table();
    table.set_header(vec!["", "ID", "Name", "Balance", "Kind", "Created"]);
    for account in session.accounts() {
        let marker = if Some(account.id.as_str()) == selected { "*" } else { "" };
        table.add_row(vec![
            marker.to_string(),
            account.id.clone(),
            account.name.clone(),
            account.balance.to_string(),
            account.kind_label().to_string(),
            account.created_at.format("%Y-%m-%d").to_string(),
        ]);
    }
    println!("{}", table);

    Ok(())
}
