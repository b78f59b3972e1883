//! `agent-router` - UserPromptSubmit hook binary.
//!
//! Always exits 0 so a routing problem never blocks the user's prompt.

use agent_router::hook;
use agent_router::logging::init_logging;
use agent_router::RouterConfig;
use clap::error::ErrorKind;
use std::io;
use std::panic;
use tracing::{error, warn};

fn main() {
    let (config, arg_error) = RouterConfig::from_env();
    if let Some(e) = &arg_error {
        if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
            e.exit();
        }
    }

    init_logging(config.debug);
    if let Some(e) = arg_error {
        warn!("Ignoring invalid arguments: {}", e);
    }

    let outcome = panic::catch_unwind(|| hook::run(&config));
    let failed = match outcome {
        Ok(Ok(())) => false,
        Ok(Err(e)) => {
            error!("Error: {}", e);
            true
        }
        Err(_) => {
            error!("Router panicked");
            true
        }
    };

    if failed {
        // Output empty response on error (non-blocking)
        hook::write_empty_output(&mut io::stdout().lock());
    }
}
