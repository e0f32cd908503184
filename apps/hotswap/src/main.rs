//! hotswap - over-the-air update engine
//!
//! Drives an `UpdateSession` from the command line. Every invocation opens a
//! session, so restart recovery runs before the command does.

mod cli;
mod display;
mod error;
mod logging;

use crate::cli::{Cli, Commands, GlobalArgs};
use crate::display::{OperationResult, OutputRenderer, StatusReport};
use crate::error::CliError;
use clap::Parser;
use hotswap_config::Config;
use hotswap_events::{EventEmitter, EventReceiver, EventSender, FailureContext};
use hotswap_install::UpdateSession;
use hotswap_types::{BinaryInfo, PackageMetadata};
use std::process;
use tokio::select;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json_mode = cli.global.json;

    init_tracing(json_mode, cli.global.debug);

    if let Err(e) = run(cli).await {
        error!("Application error: {}", e);
        if !json_mode {
            eprintln!("Error: {e}");
        }
        process::exit(1);
    }
}

/// Main application logic
async fn run(cli: Cli) -> Result<(), CliError> {
    info!("Starting hotswap v{}", env!("CARGO_PKG_VERSION"));

    // File config (or defaults), then environment, then CLI flags
    let mut config = Config::load_or_default(cli.global.config.as_deref()).await?;
    config.merge_env()?;
    apply_cli_config(&mut config, &cli.global);

    let binary = BinaryInfo::new(
        cli.global.build_marker,
        cli.global
            .app_version
            .clone()
            .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string()),
    );

    let (event_sender, event_receiver) = hotswap_events::channel();
    let renderer = OutputRenderer::new(cli.global.json);

    let result =
        execute_command_with_events(cli.command, config, binary, event_sender, event_receiver)
            .await?;

    renderer.render_result(&result)?;

    info!("Command completed successfully");
    Ok(())
}

/// Execute command with concurrent event handling
async fn execute_command_with_events(
    command: Commands,
    config: Config,
    binary: BinaryInfo,
    event_sender: EventSender,
    mut event_receiver: EventReceiver,
) -> Result<OperationResult, CliError> {
    let operation = command.name();
    event_sender.emit_operation_started(operation);
    let mut command_future = Box::pin(execute_command(
        command,
        config,
        binary,
        event_sender.clone(),
    ));

    loop {
        select! {
            result = &mut command_future => {
                let failure = match &result {
                    Ok(_) => None,
                    Err(CliError::Config(e) | CliError::Update(e)) => {
                        Some(FailureContext::from_error(e))
                    }
                    Err(other) => Some(FailureContext {
                        code: None,
                        message: other.to_string(),
                        hint: None,
                        retryable: false,
                    }),
                };
                event_sender.emit_operation_finished(operation, failure);

                // Drain any remaining events
                while let Ok(event) = event_receiver.try_recv() {
                    logging::log_event_with_tracing(&event);
                }
                return result;
            }

            event = event_receiver.recv() => {
                if let Some(event) = event {
                    logging::log_event_with_tracing(&event);
                }
            }
        }
    }
}

/// Open a session and execute the specified command
async fn execute_command(
    command: Commands,
    config: Config,
    binary: BinaryInfo,
    event_sender: EventSender,
) -> Result<OperationResult, CliError> {
    let default_entry = config.runtime.entry_file_name.clone();
    let mut session = UpdateSession::open(config, binary, Some(event_sender)).await?;

    match command {
        Commands::Status => {
            let report = StatusReport {
                root: session.store().root().display().to_string(),
                app_version: session.binary().app_version.clone(),
                build_marker: session.binary().build_marker,
                restart: format!("{:?}", session.restart_outcome()),
                current: session.get_current_package().await?,
                previous: session.get_previous_package().await?,
                pending: session.records().get_pending_update().await?,
                did_update: session.did_update(),
                need_to_report_rollback: session.need_to_report_rollback(),
            };
            Ok(OperationResult::Status(report))
        }

        Commands::Download {
            metadata,
            entry_file,
            install,
        } => {
            let contents = tokio::fs::read_to_string(&metadata).await?;
            let meta: PackageMetadata = serde_json::from_str(&contents)?;
            let entry = entry_file.unwrap_or(default_entry);

            let mut progress = session.progress_throttle(|p| {
                tracing::trace!(
                    received_bytes = p.received_bytes,
                    total_bytes = p.total_bytes,
                    "progress"
                );
            });
            let stored = session.download(&meta, &entry, &mut progress).await?;
            if install {
                session.install(&stored).await?;
            }
            Ok(OperationResult::Package(stored))
        }

        Commands::Install { hash } => {
            let Some(meta) = session.get_package(&hash).await? else {
                return Err(CliError::InvalidArguments(format!(
                    "no downloaded package with hash '{hash}'"
                )));
            };
            session.install(&meta).await?;
            Ok(OperationResult::Package(meta))
        }

        Commands::Confirm => {
            session.confirm_ready().await?;
            Ok(OperationResult::Success("Running package confirmed".to_string()))
        }

        Commands::Rollback => match session.rollback().await? {
            Some(restored) => Ok(OperationResult::Success(format!(
                "Rolled back to {restored}"
            ))),
            None => Ok(OperationResult::Success(
                "Rolled back to the binary's bundle".to_string(),
            )),
        },

        Commands::Clear => {
            session.clear_updates().await?;
            Ok(OperationResult::Success("All updates removed".to_string()))
        }

        Commands::Failed => Ok(OperationResult::FailedUpdates(
            session.failed_updates().await?,
        )),

        Commands::Entry { entry_file } => {
            let entry = entry_file.unwrap_or(default_entry);
            let source = session.resolve_entry_file(&entry).await?;
            Ok(OperationResult::Entry(source.into()))
        }
    }
}

/// Initialize tracing/logging
fn init_tracing(json_mode: bool, debug_enabled: bool) {
    let default_directives = if debug_enabled {
        "debug,hotswap=debug"
    } else {
        "info,hotswap=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if json_mode {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Apply CLI configuration overrides (highest precedence)
fn apply_cli_config(config: &mut Config, global: &GlobalArgs) {
    if let Some(root) = &global.root {
        config.paths.root_dir = Some(root.clone());
    }
    if global.debug {
        config.runtime.debug_mode = true;
    }
}
