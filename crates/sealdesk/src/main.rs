// SPDX-FileCopyrightText: 2026 Sealdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sealdesk - a support ticket bot with encrypted transcript archives.
//!
//! This is the binary entry point for the Sealdesk bot.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod decrypt;
mod doctor;
mod inspect;
mod serve;

/// Sealdesk - a support ticket bot with encrypted transcript archives.
#[derive(Parser, Debug)]
#[command(name = "sealdesk", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the bot: interaction webhook and gateway client.
    Serve,
    /// Run diagnostic checks against the Sealdesk environment.
    Doctor {
        /// Disable colored output.
        #[arg(long)]
        plain: bool,
    },
    /// Print a transcript archive's manifest without decrypting anything.
    Inspect {
        /// Path to the `.sdtranscript` archive.
        archive: PathBuf,
    },
    /// Decrypt a transcript archive with its one-time key file.
    Decrypt {
        /// Path to the `.sdtranscript` archive.
        archive: PathBuf,
        /// Path to the `.key.pem` file delivered at close time.
        key: PathBuf,
        /// Directory to write the decrypted sections under. Defaults to
        /// `<archive stem>.decrypted` next to the archive.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match sealdesk_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            sealdesk_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.bot.log_level);

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Doctor { plain }) => doctor::run_doctor(&config, plain).await,
        Some(Commands::Inspect { archive }) => inspect::run_inspect(&archive),
        Some(Commands::Decrypt { archive, key, out }) => {
            decrypt::run_decrypt(&archive, &key, out.as_deref())
        }
        None => {
            println!("sealdesk: use --help for available commands");
            Ok(())
        }
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("sealdesk={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
