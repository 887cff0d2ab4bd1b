// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gatepass - attendee synchronization for HikCentral / Hikvision access control.
//!
//! This is the binary entry point.

mod profile;
mod runtime;
mod serve;
mod status;
mod sync;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use gatepass_config::model::GatepassConfig;

/// Gatepass - attendee synchronization for access-control systems.
#[derive(Parser, Debug)]
#[command(name = "gatepass", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP gateway and the optional auto-sync loop.
    Serve,
    /// Sync one attendee now.
    Sync {
        /// Attendee identifier.
        attendee_id: String,
    },
    /// Sync every pending or failed attendee in batches.
    SyncPending,
    /// Show sync counts, recent batches and device connectivity.
    Status {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
        /// Disable colors.
        #[arg(long)]
        plain: bool,
    },
    /// Print a new random vault master key.
    GenKey,
    /// Manage stored device profiles.
    Profile {
        #[command(subcommand)]
        action: ProfileCommands,
    },
}

#[derive(Subcommand, Debug)]
enum ProfileCommands {
    /// Encrypt the [device] section of the config into the database.
    Import {
        /// Make the imported profile the active one.
        #[arg(long)]
        activate: bool,
    },
    /// Show a stored profile with credentials redacted.
    Show {
        /// Profile name.
        name: String,
    },
}

fn load_config(path: Option<&std::path::Path>) -> Option<GatepassConfig> {
    let loaded = match path {
        Some(path) => gatepass_config::load_and_validate_path(path),
        None => gatepass_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => Some(config),
        Err(errors) => {
            gatepass_config::render_errors(&errors);
            None
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("gatepass: use --help for available commands");
        return ExitCode::SUCCESS;
    };

    if let Commands::GenKey = command {
        return match gatepass_vault::generate_master_key() {
            Ok(key) => {
                println!("{}", secrecy::ExposeSecret::expose_secret(&key));
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("error: {e}");
                ExitCode::FAILURE
            }
        };
    }

    let Some(config) = load_config(cli.config.as_deref()) else {
        return ExitCode::FAILURE;
    };
    serve::init_tracing(&config.logging.level);

    let outcome = match command {
        Commands::GenKey => Ok(true),
        Commands::Serve => serve::run_serve(config).await.map(|()| true),
        Commands::Sync { attendee_id } => sync::run_sync_one(config, &attendee_id).await,
        Commands::SyncPending => sync::run_sync_pending(config).await,
        Commands::Status { json, plain } => {
            status::run_status(config, json, plain).await.map(|()| true)
        }
        Commands::Profile { action } => match action {
            ProfileCommands::Import { activate } => profile::run_profile_import(config, activate)
                .await
                .map(|_| true),
            ProfileCommands::Show { name } => {
                profile::run_profile_show(config, &name).await.map(|()| true)
            }
        },
    };

    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_sync_and_status_flags() {
        let cli = Cli::try_parse_from(["gatepass", "sync", "att-42"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Sync { ref attendee_id }) if attendee_id == "att-42"
        ));

        let cli = Cli::try_parse_from(["gatepass", "status", "--json"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Status {
                json: true,
                plain: false
            })
        ));

        let cli = Cli::try_parse_from([
            "gatepass",
            "--config",
            "/tmp/g.toml",
            "profile",
            "import",
            "--activate",
        ])
        .unwrap();
        assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("/tmp/g.toml")));
        assert!(matches!(
            cli.command,
            Some(Commands::Profile {
                action: ProfileCommands::Import { activate: true }
            })
        ));
    }

    #[test]
    fn gen_key_needs_no_arguments() {
        let cli = Cli::try_parse_from(["gatepass", "gen-key"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::GenKey)));
    }

    #[test]
    fn sync_requires_attendee_id() {
        assert!(Cli::try_parse_from(["gatepass", "sync"]).is_err());
    }

    #[test]
    #[serial_test::serial]
    fn binary_loads_config_defaults() {
        let config = load_config(None).expect("default config should be valid");
        assert_eq!(config.server.port, 8080);
    }
}
