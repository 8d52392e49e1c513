use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::config;
use crate::notes::fs::FsNoteStore;
use crate::sources;
use crate::sync::notify::ConsoleNotifier;
use crate::sync::schedule::run_periodic;
use crate::sync::SyncEngine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Sync,
    Watch,
    Help,
}

#[derive(Debug, PartialEq, Eq)]
pub struct Invocation {
    pub command: Command,
    pub config_path: Option<PathBuf>,
}

/// Parse `tasknotes` arguments.
///
/// Supported forms:
///   tasknotes
///   tasknotes sync
///   tasknotes watch -c ~/vault-sync.toml
///   tasknotes --config ~/vault-sync.toml sync
pub fn parse_args(args: &[String]) -> Result<Invocation> {
    let mut command: Option<Command> = None;
    let mut config_path: Option<PathBuf> = None;
    let mut i = 0;

    while i < args.len() {
        match args[i].as_str() {
            "-c" | "--config" => {
                i += 1;
                match args.get(i) {
                    Some(path) => config_path = Some(PathBuf::from(path)),
                    None => bail!("Missing value for -c/--config flag"),
                }
            }
            "-h" | "--help" | "help" => command = Some(Command::Help),
            word => {
                let parsed = match word {
                    "sync" => Command::Sync,
                    "watch" => Command::Watch,
                    other => bail!("Unknown command: {other}"),
                };
                if command.is_some_and(|c| c != Command::Help) {
                    bail!("Only one command may be given");
                }
                if command.is_none() {
                    command = Some(parsed);
                }
            }
        }
        i += 1;
    }

    Ok(Invocation {
        command: command.unwrap_or(Command::Sync),
        config_path,
    })
}

pub async fn run(invocation: Invocation) -> Result<ExitCode> {
    if invocation.command == Command::Help {
        print_help();
        return Ok(ExitCode::SUCCESS);
    }

    let app_config = config::load_config(invocation.config_path.as_deref())?;
    let sync_config = app_config.sync_config();
    let source = sources::create_source(&app_config).context("Failed to set up tracker")?;
    let store = FsNoteStore::new(&app_config.vault);
    let mut engine = SyncEngine::new(source, Box::new(store), Box::new(ConsoleNotifier));

    match invocation.command {
        Command::Watch => {
            let every = app_config
                .poll_interval()
                .context("`watch` needs poll_interval_minutes > 0 in the config")?;
            let shutdown = async {
                let _ = tokio::signal::ctrl_c().await;
            };
            run_periodic(&mut engine, &sync_config, every, shutdown).await;
            Ok(ExitCode::SUCCESS)
        }
        _ => match engine.run(&sync_config).await {
            Ok(_) => Ok(ExitCode::SUCCESS),
            Err(_) => Ok(ExitCode::FAILURE),
        },
    }
}

pub fn print_help() {
    println!("tasknotes - sync tracker work items into Markdown notes\n");
    println!("USAGE:");
    println!("  tasknotes [sync]   Run one sync pass");
    println!("  tasknotes watch    Sync now and then every poll interval until Ctrl-C");
    println!("  tasknotes help     Show this help");
    println!();
    println!("OPTIONS:");
    println!("  -c, --config <path>  Config file (default ~/.agile-task-notes/config.toml)");
    println!();
    println!("Set RUST_LOG=debug for per-task details.");
}
