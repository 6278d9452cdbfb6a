//! Turnkeeper -- console driver for the turn-coordination core.
//!
//! Reads commands from stdin and writes responses to stdout, one command per
//! line. Diagnostics go to stderr through `tracing`.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

use turnkeeper::config::SessionConfig;
use turnkeeper::protocol::parse_command;
use turnkeeper::session::Session;

#[derive(Parser, Debug)]
#[command(name = "turnkeeper", version, about = "Drive movement turns from the console")]
struct Args {
    /// JSON session config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log filter, overriding the config (e.g. `turnkeeper=debug`).
    #[arg(long)]
    log: Option<String>,
}

fn init_logging(filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Runs the main command loop until `quit` or end of input.
fn main() -> ExitCode {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => match SessionConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("{}", e);
                return ExitCode::FAILURE;
            }
        },
        None => SessionConfig::default(),
    };
    init_logging(args.log.as_deref().unwrap_or(&config.log_filter));

    let mut session = match Session::new(config) {
        Ok(session) => session,
        Err(e) => {
            error!("failed to start session: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                warn!("stdin closed: {}", e);
                break;
            }
        };

        let cmd = match parse_command(&line) {
            Some(c) => c,
            None => continue,
        };

        match session.dispatch(cmd, &mut out) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => {
                error!("failed to write response: {}", e);
                return ExitCode::FAILURE;
            }
        }
    }

    session.shutdown();
    if out.flush().is_err() {
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
