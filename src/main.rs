//! plugdeps CLI entry point
//!
//! Parses arguments, runs the command and maps the outcome to an exit code:
//! 0 when every required dependency is satisfied, 1 when one is not, 2 when
//! the command itself failed.

use clap::Parser;
use plugdeps_cli::cli;
use plugdeps_cli::core::error::user_friendly_error;

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    // Set up colored output for Windows
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(outcome) => std::process::exit(outcome.exit_code()),
        Err(e) => {
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(2);
        }
    }
}
