//! Service host: runs the payload and the updater until shutdown

use hotswap_errors::OpsError;
use hotswap_events::EventEmitter;
use hotswap_platform::PlatformContext;
use hotswap_types::Outcome;
use std::future::Future;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};

use crate::updater::PollingUpdater;
use crate::OpsCtx;

/// Hosts the managed payload the way a registered service runs it.
///
/// The payload is started first and the updater only after it, so a
/// payload that cannot start never triggers an update.
pub struct ServiceHost {
    payload: Vec<String>,
    stop_timeout: Duration,
    updater: Option<PollingUpdater>,
    attended: bool,
}

impl ServiceHost {
    /// `payload` is the command line of the hosted program; empty hosts
    /// nothing but the updater.
    #[must_use]
    pub fn new(payload: Vec<String>, stop_timeout: Duration) -> Self {
        Self {
            payload,
            stop_timeout,
            updater: None,
            attended: true,
        }
    }

    /// Attach the updater. It only runs when `attended` is false.
    #[must_use]
    pub fn with_updater(mut self, updater: PollingUpdater, attended: bool) -> Self {
        self.updater = Some(updater);
        self.attended = attended;
        self
    }

    fn start_payload(&self) -> Result<Option<Child>, OpsError> {
        let Some((program, args)) = self.payload.split_first() else {
            return Ok(None);
        };
        Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map(Some)
            .map_err(|e| OpsError::PayloadStartFailed {
                command: self.payload.join(" "),
                message: e.to_string(),
            })
    }

    /// Run until `shutdown` resolves or the payload exits on its own.
    pub async fn run<F>(self, ctx: &OpsCtx, shutdown: F) -> Outcome
    where
        F: Future<Output = ()>,
    {
        ctx.emit_operation_started("service host");

        let mut child = match self.start_payload() {
            Ok(child) => child,
            Err(error) => {
                ctx.emit_error_with_details("hosted payload did not start", error.to_string());
                ctx.emit_operation_completed("service host", false);
                return Outcome::StartServiceFailed;
            }
        };

        let updater = self
            .updater
            .and_then(|updater| updater.spawn(self.attended));

        let outcome = match child.as_mut() {
            Some(payload) => {
                tokio::select! {
                    () = shutdown => stop_payload(ctx, payload, self.stop_timeout).await,
                    status = payload.wait() => {
                        let success = status.as_ref().is_ok_and(std::process::ExitStatus::success);
                        ctx.emit_warning(format!("hosted payload exited on its own: {status:?}"));
                        if success { Outcome::Ok } else { Outcome::Failed }
                    }
                }
            }
            None => {
                shutdown.await;
                Outcome::Ok
            }
        };

        if let Some(handle) = updater {
            handle.abort();
        }
        ctx.emit_operation_completed("service host", outcome.is_ok());
        outcome
    }
}

async fn stop_payload(ctx: &OpsCtx, payload: &mut Child, stop_timeout: Duration) -> Outcome {
    if let Some(pid) = payload.id() {
        let mut term = ctx.process.create_command("kill");
        term.args(["-TERM", pid.to_string().as_str()]);
        let platform_ctx = PlatformContext::new(Some(ctx.tx.clone()));
        if let Err(error) = ctx.process.execute_command(&platform_ctx, term).await {
            ctx.emit_warning(format!("could not signal hosted payload: {error}"));
        }
    }

    if let Ok(Ok(_)) = tokio::time::timeout(stop_timeout, payload.wait()).await {
        return Outcome::Ok;
    }

    ctx.emit_warning("hosted payload ignored SIGTERM; killing it");
    match payload.kill().await {
        Ok(()) => Outcome::Ok,
        Err(error) => {
            ctx.emit_error(format!("could not kill hosted payload: {error}"));
            Outcome::StopServiceFailed
        }
    }
}
