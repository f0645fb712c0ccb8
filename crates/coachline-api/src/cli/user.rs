//! Account CLI commands: add, list.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use dialoguer::Password;
use secrecy::SecretString;

use coachline_core::service::account::Registration;
use coachline_types::user::Role;

use crate::state::AppState;

/// Register an account, prompting for the password if none was given.
///
/// # Examples
///
/// ```bash
/// # Secure prompt (recommended)
/// coachline user add coach_kim --role coach
///
/// # Script/automation mode
/// COACHLINE_PASSWORD=... coachline user add alex
/// ```
pub async fn add_user(
    state: &AppState,
    username: String,
    email: String,
    role: &str,
    password: Option<String>,
    json: bool,
) -> Result<()> {
    let role: Role = role.parse().map_err(anyhow::Error::msg)?;

    let password = match password {
        Some(p) => p,
        None => Password::new()
            .with_prompt(format!("Password for {}", style(&username).bold()))
            .with_confirmation("Repeat password", "Passwords do not match")
            .interact()?,
    };

    let user = state
        .account_service
        .register(Registration {
            username,
            email,
            password: SecretString::from(password),
            role,
        })
        .await?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "id": user.id.to_string(),
                "username": user.username,
                "role": user.role,
            })
        );
    } else {
        println!(
            "  {} Registered {} '{}'",
            style("✓").green().bold(),
            user.role,
            style(&user.username).cyan().bold()
        );
    }

    Ok(())
}

/// List accounts, optionally filtered by role.
pub async fn list_users(state: &AppState, role: Option<&str>, json: bool) -> Result<()> {
    let role = role
        .map(|r| r.parse::<Role>().map_err(anyhow::Error::msg))
        .transpose()?;
    let users = state.account_service.list_users(role).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&users)?);
        return Ok(());
    }

    if users.is_empty() {
        println!();
        println!(
            "  {} No accounts yet. Add one with: {}",
            style("i").blue().bold(),
            style("coachline user add <username> --role coach").yellow()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Username").fg(Color::White),
        Cell::new("Role").fg(Color::White),
        Cell::new("Email").fg(Color::White),
        Cell::new("Created").fg(Color::White),
    ]);

    for user in &users {
        let role_color = match user.role {
            Role::Coach => Color::Magenta,
            Role::Client => Color::Green,
        };
        table.add_row(vec![
            Cell::new(&user.username).fg(Color::Cyan),
            Cell::new(user.role.to_string()).fg(role_color),
            Cell::new(&user.email),
            Cell::new(user.created_at.format("%Y-%m-%d").to_string()).fg(Color::DarkGrey),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  {} account{}",
        style(users.len()).bold(),
        if users.len() == 1 { "" } else { "s" }
    );
    println!();

    Ok(())
}
