//! Conversation history CLI command.

use anyhow::Result;
use console::style;

use coachline_types::user::Identity;

use crate::state::AppState;

/// Print every stored message between `a` and `b`, oldest first.
pub async fn show_history(state: &AppState, a: &str, b: &str, json: bool) -> Result<()> {
    let entries = state
        .history_service
        .conversation(&Identity::new(a), &Identity::new(b))
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!();
        println!(
            "  {} No messages between {} and {}",
            style("i").blue().bold(),
            style(a).cyan(),
            style(b).cyan()
        );
        println!();
        return Ok(());
    }

    println!();
    for entry in &entries {
        println!(
            "  {} {} {}",
            style(entry.timestamp.format("%Y-%m-%d %H:%M:%S")).dim(),
            style(format!("{}:", entry.sender)).cyan().bold(),
            entry.content
        );
    }
    println!();
    println!(
        "  {} message{}",
        style(entries.len()).bold(),
        if entries.len() == 1 { "" } else { "s" }
    );
    println!();

    Ok(())
}
