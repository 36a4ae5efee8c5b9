//! Transactions command - list transactions on the selected account

use anyhow::Result;
use colored::Colorize;
use familynest_core::OperationResult;

use super::get_context;
use crate::output;

pub async fn run(json: bool) -> Result<()> {
    let ctx = get_context().await?;
    let session = ctx.session.session();

    let Some(account) = session.selected_account() else {
        if session.user().is_none() {
            output::warning("Not logged in. Run 'nest login' first.");
        } else {
            output::warning("No account selected. Run 'nest select <account-id>'.");
        }
        return Ok(());
    };

    let pb = output::spinner("Loading transactions...");
    let result = ctx.session.fetch_selected_transactions().await;
    pb.finish_and_clear();

    if json {
        let result = OperationResult::from(result);
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }
    let transactions = result?;

    println!("{}", output::account_line(account));
    if transactions.is_empty() {
        println!("No transactions yet.");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Date", "Description", "Amount"]);
    for tx in &transactions {
        let amount = if tx.is_deposit() {
            format!("+{}", tx.amount).green()
        } else {
            tx.amount.to_string().red()
        };
        table.add_row(vec![
            tx.created_at.format("%Y-%m-%d %H:%M").to_string(),
            tx.description.clone(),
            amount.to_string(),
        ]);
    }
    println!("{}", table);

    Ok(())
}
