//! Output formatting utilities

use std::time::Duration;

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, ContentArrangement, Table};
use familynest_core::{Account, Session};
use indicatif::{ProgressBar, ProgressStyle};

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{}", msg.cyan());
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Spinner shown while a session operation is in flight
pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// One-line description of an account
pub fn account_line(account: &Account) -> String {
    format!(
        "{} ({} account, {})",
        account.name.bold(),
        account.kind_label().to_lowercase(),
        account.balance
    )
}

/// Print who is signed in and which account is selected
pub fn signed_in_summary(session: &Session) {
    let Some(user) = session.user() else {
        warning("Not logged in");
        return;
    };
    println!("Signed in as {} ({})", user.username.bold(), user.role);

    match session.selected_account() {
        Some(account) => println!("Selected account: {}", account_line(account)),
        None if session.accounts().is_empty() => warning("No accounts available"),
        None => warning("No account selected"),
    }
}
