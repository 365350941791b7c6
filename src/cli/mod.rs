//! Command-line interface for the idea board.

pub mod commands;
pub mod context;
pub mod display;
pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::domain::errors::FetchError;
use commands::{idea::IdeaArgs, profile::ProfileArgs};

#[derive(Parser, Debug)]
#[command(name = "ideaboard")]
#[command(about = "Idea board client with cached fetches and edit locks", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to .ideaboard/config.yaml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Profile commands
    Profile(ProfileArgs),
    /// Idea and edit lock commands
    Idea(IdeaArgs),
}

/// Print an error the way the UI would show it and exit non-zero.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    let fetch_error = err.downcast_ref::<FetchError>();
    let message = fetch_error.map_or_else(|| format!("{err:#}"), |e| e.user_message().to_string());

    if json_mode {
        let body = serde_json::json!({
            "success": false,
            "error": message,
            "detail": format!("{err:#}"),
            "requires_login": fetch_error.is_some_and(FetchError::requires_login),
        });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("{}", display::failure(&message));
        if fetch_error.is_some() {
            eprintln!("  {}", console::style(format!("{err:#}")).dim());
        }
    }
    std::process::exit(1);
}
