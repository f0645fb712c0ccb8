//! CLI command definitions for the `coachline` binary.
//!
//! Uses clap derive macros for argument parsing. Account administration and
//! history inspection run directly against the data directory; `serve`
//! starts the relay and REST API.

pub mod history;
pub mod user;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Real-time coach/client message relay.
#[derive(Parser)]
#[command(name = "coachline", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the relay and REST API server.
    Serve {
        /// Port to listen on (defaults to config.toml, then 8080).
        #[arg(long, short)]
        port: Option<u16>,

        /// Host to bind to (defaults to config.toml, then 127.0.0.1).
        #[arg(long)]
        host: Option<String>,

        /// Export tracing spans to stdout via OpenTelemetry.
        #[arg(long)]
        otel: bool,
    },

    /// Manage accounts (add, list).
    User {
        #[command(subcommand)]
        action: UserCommand,
    },

    /// Print the stored conversation between two users, oldest first.
    History {
        /// One participant.
        a: String,
        /// The other participant.
        b: String,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum UserCommand {
    /// Register a new account.
    Add {
        /// Unique username (3-32 characters of letters, digits, '_', '.', '-').
        username: String,

        /// Contact email.
        #[arg(long, default_value = "")]
        email: String,

        /// Account role: coach or client.
        #[arg(long, default_value = "client")]
        role: String,

        /// Password (prompted when omitted).
        #[arg(long, env = "COACHLINE_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// List accounts.
    #[command(alias = "ls")]
    List {
        /// Only show accounts with this role.
        #[arg(long)]
        role: Option<String>,
    },
}
