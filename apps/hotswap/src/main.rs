//! hotswap - self-updating service host
//!
//! Every invocation runs exactly one workflow and exits with its outcome
//! code. The same binary is the registered service (`run`), the installer
//! (`install`, `uninstall`) and the upgrade step a freshly applied release
//! is relaunched into (`updated`).

mod cli;
mod error;
mod events;
mod logging;

use crate::cli::{Cli, Commands};
use crate::error::CliError;
use crate::events::EventHandler;
use clap::Parser;
use hotswap_config::Config;
use hotswap_events::EventReceiver;
use hotswap_feed::DirectoryFeed;
use hotswap_ops::{OpsContextBuilder, OpsCtx, PollingUpdater, ServiceHost, WorkflowBuilder};
use hotswap_platform::{
    running_under_systemd, PlatformContext, SystemdServiceManager, TokioProcessOperations,
};
use hotswap_types::{Outcome, ReleaseVersion};
use std::future::Future;
use std::io::IsTerminal;
use std::path::Path;
use std::process;
use std::sync::Arc;
use tokio::select;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let outcome = match run(cli).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Application error: {}", e);
            eprintln!("Error: {e}");
            Outcome::Failed
        }
    };

    process::exit(outcome.code());
}

/// Main application logic
async fn run(cli: Cli) -> Result<Outcome, CliError> {
    let command = cli.command();

    // lifecycle markers a relaunched release may receive; nothing to do
    if matches!(command, Commands::Firstrun | Commands::Obsolete) {
        return Ok(Outcome::Ok);
    }

    // 1. file config (or defaults), 2. environment overrides
    let mut config = Config::load_or_default(cli.global.config.as_deref())
        .await
        .map_err(CliError::Config)?;
    config.merge_env().map_err(CliError::Config)?;
    config.validate().map_err(CliError::Config)?;

    let attended = !cli.global.unattended
        && std::io::stdin().is_terminal()
        && std::io::stdout().is_terminal();
    let service_mode = command == Commands::Run && !attended;
    init_tracing(&config, cli.global.debug, service_mode);

    info!("Starting hotswap v{}", env!("CARGO_PKG_VERSION"));

    let (event_sender, event_receiver) = hotswap_events::channel();
    let process_ops = Arc::new(TokioProcessOperations::new());
    let manager = SystemdServiceManager::new(
        process_ops.clone(),
        PlatformContext::new(Some(event_sender.clone())),
        &config.platform.unit_dir,
        config.platform.use_sudo,
    );

    let ops_ctx = OpsContextBuilder::new()
        .with_service_manager(Arc::new(manager))
        .with_process_operations(process_ops)
        .with_event_sender(event_sender)
        .build()?;

    let mut event_handler = EventHandler::new(attended);
    let outcome = execute_with_events(
        execute_command(command, &config, &ops_ctx, attended),
        event_receiver,
        &mut event_handler,
    )
    .await?;

    info!(outcome = %outcome, code = outcome.code(), "Command finished");
    Ok(outcome)
}

/// Drive `command` while draining events into the handler
async fn execute_with_events<F>(
    command: F,
    mut event_receiver: EventReceiver,
    event_handler: &mut EventHandler,
) -> Result<Outcome, CliError>
where
    F: Future<Output = Result<Outcome, CliError>>,
{
    let mut command_future = Box::pin(command);

    loop {
        select! {
            result = &mut command_future => {
                while let Ok(event) = event_receiver.try_recv() {
                    event_handler.handle_event(event);
                }
                return result;
            }

            event = event_receiver.recv() => {
                match event {
                    Some(event) => event_handler.handle_event(event),
                    None => { /* Channel closed: keep waiting for command to finish */ }
                }
            }
        }
    }
}

/// Execute the specified command
async fn execute_command(
    command: Commands,
    config: &Config,
    ctx: &OpsCtx,
    attended: bool,
) -> Result<Outcome, CliError> {
    let base = config.service_identity()?;
    let builder = WorkflowBuilder::new(ctx, base);

    match command {
        Commands::Install { version } => {
            let version = checked_version(&version)?;
            let workflow = builder.install_and_start(&version, config.launch_spec(&version));
            Ok(workflow.run(ctx).await)
        }

        Commands::Uninstall { version } => {
            let version = version.as_deref().map(checked_version).transpose()?;
            let workflow = builder.stop_and_uninstall(version.as_deref()).await?;
            Ok(workflow.run(ctx).await)
        }

        Commands::Updated { version } => {
            let version = checked_version(&version)?;
            let workflow = builder
                .update(
                    &version,
                    config.launch_spec(&version),
                    config.update.overlapping,
                )
                .await?;
            Ok(workflow.run(ctx).await)
        }

        Commands::Run => host(config, ctx, attended).await,

        Commands::Firstrun | Commands::Obsolete => Ok(Outcome::Ok),
    }
}

/// Normalise a version argument so registry names are stable
fn checked_version(version: &str) -> Result<String, CliError> {
    ReleaseVersion::parse(version)
        .map(|v| v.to_string())
        .map_err(|e| CliError::InvalidArguments(format!("{version}: {e}")))
}

/// Host the payload until SIGINT or SIGTERM
async fn host(config: &Config, ctx: &OpsCtx, attended: bool) -> Result<Outcome, CliError> {
    let current = ReleaseVersion::parse(env!("CARGO_PKG_VERSION")).ok();
    let base = config.service_identity()?;
    let mut feed = DirectoryFeed::new(
        &config.update.feed_dir,
        &config.update.install_root,
        &config.update.executable_name,
        ctx.process.clone(),
        PlatformContext::new(Some(ctx.tx.clone())),
    )
    .with_current_version(current.clone());
    if running_under_systemd() {
        // the relaunched process must outlive the unit it is about to stop
        feed = feed.with_transient_relaunch(
            base.name(),
            config.platform.use_sudo && !running_as_root(),
        );
    }

    let updater = PollingUpdater::new(Arc::new(feed), ctx.tx.clone())
        .with_check_period(config.check_period())
        .with_current_version(current);

    let host = ServiceHost::new(config.service.exec.clone(), base.stop_timeout())
        .with_updater(updater, attended);

    let mut terminate = signal(SignalKind::terminate())?;
    let shutdown = async move {
        select! {
            result = tokio::signal::ctrl_c() => {
                if result.is_err() {
                    // no SIGINT handler; wait for SIGTERM alone
                    terminate.recv().await;
                }
            }
            _ = terminate.recv() => {}
        }
    };

    Ok(host.run(ctx, shutdown).await)
}

fn running_as_root() -> bool {
    use std::os::unix::fs::MetadataExt;
    std::fs::metadata("/proc/self").is_ok_and(|meta| meta.uid() == 0)
}

fn env_filter(default: &str) -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default))
}

/// Initialize tracing/logging
///
/// Interactive runs log to stderr. With `--debug`, in service mode, or
/// when `logging.json` is set, logs go as JSON to a timestamped file in the
/// configured log directory.
fn init_tracing(config: &Config, debug_enabled: bool, service_mode: bool) {
    let default_filter = if debug_enabled {
        "info,hotswap=debug"
    } else {
        "warn,hotswap=info"
    };

    if debug_enabled || service_mode || config.logging.json {
        if let Some(file) = open_log_file(&config.logging.directory) {
            tracing_subscriber::fmt()
                .json()
                .with_writer(file)
                .with_env_filter(env_filter(default_filter))
                .init();
            return;
        }
    }

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(env_filter(default_filter))
        .init();
}

fn open_log_file(log_dir: &Path) -> Option<std::fs::File> {
    if let Err(e) = std::fs::create_dir_all(log_dir) {
        eprintln!("Warning: Failed to create log directory: {e}");
        return None;
    }

    let log_file = log_dir.join(format!(
        "hotswap-{}.log",
        chrono::Utc::now().format("%Y%m%d-%H%M%S")
    ));

    match std::fs::File::create(&log_file) {
        Ok(file) => Some(file),
        Err(e) => {
            eprintln!("Warning: Failed to create log file: {e}");
            None
        }
    }
}
