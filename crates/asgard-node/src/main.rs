//! # Asgard Node
//!
//! Starts the server from `AG_*` environment variables and reads operator
//! commands from stdin. `quit` or end of input stops the server.

use std::io::{self, BufRead};

use anyhow::{Context, Result};
use asgard_node::{NodeConfig, NodeRuntime, OperatorCommand, HELP};
use asgard_telemetry::init_logging;
use tracing::{error, info, warn};

fn main() -> Result<()> {
    let config = NodeConfig::from_env().context("Failed to load configuration")?;
    init_logging(&config.telemetry).context("Failed to initialize logging")?;

    let runtime = NodeRuntime::new(config)?;
    let address = runtime.start()?;
    info!(%address, "Node ready; type 'help' for commands");

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                error!(error = %e, "Failed to read operator input");
                break;
            }
        };

        match OperatorCommand::parse(&line) {
            OperatorCommand::Status => match runtime.status_report() {
                Ok(report) => println!("{report}"),
                Err(e) => warn!(error = %e, "Status unavailable"),
            },
            OperatorCommand::Help => println!("{HELP}"),
            OperatorCommand::Quit => break,
            OperatorCommand::Empty => {}
            OperatorCommand::Unknown(command) => {
                warn!(%command, "Unknown command; type 'help' for commands");
            }
        }
    }

    runtime.shutdown()
}
