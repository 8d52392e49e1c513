mod board;
mod cli;
mod config;
mod error;
mod model;
mod notes;
mod sources;
mod sync;
mod util;

use std::process::ExitCode;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,tasknotes=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_logging();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let invocation = match cli::parse_args(&args) {
        Ok(invocation) => invocation,
        Err(e) => {
            eprintln!("Error: {e}\n");
            cli::print_help();
            return Ok(ExitCode::from(2));
        }
    };

    cli::run(invocation).await
}
