//! Process operations backed by `tokio::process`

use async_trait::async_trait;
use hotswap_errors::ServiceError;
use hotswap_events::{
    AppEvent, EventEmitter, FailureContext, PlatformEvent, ProcessCommandDescriptor,
};
use std::convert::TryFrom;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;

use crate::core::PlatformContext;
use crate::process::{CommandOutput, PlatformCommand, ProcessOperations};

const SETSID: &str = "setsid";

/// Runs commands on the local host
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioProcessOperations;

impl TokioProcessOperations {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn duration_to_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn descriptor(cmd: &PlatformCommand) -> ProcessCommandDescriptor {
    ProcessCommandDescriptor {
        program: cmd.program().to_string(),
        args: cmd.get_args().to_vec(),
        cwd: cmd.get_current_dir().cloned(),
    }
}

fn tokio_command(cmd: &PlatformCommand) -> Command {
    let mut command = Command::new(cmd.program());
    command.args(cmd.get_args()).stdin(Stdio::null());
    if let Some(dir) = cmd.get_current_dir() {
        command.current_dir(dir);
    }
    command
}

#[async_trait]
impl ProcessOperations for TokioProcessOperations {
    async fn execute_command(
        &self,
        ctx: &PlatformContext,
        cmd: PlatformCommand,
    ) -> Result<CommandOutput, ServiceError> {
        let start = Instant::now();
        let descriptor = descriptor(&cmd);

        ctx.emit(AppEvent::Platform(PlatformEvent::CommandStarted {
            command: descriptor.clone(),
        }));

        // dropping the future (stop timeout) must not leave the child behind
        let result = tokio_command(&cmd)
            .kill_on_drop(true)
            .output()
            .await
            .map(|output| CommandOutput {
                exit_code: output.status.code(),
                stdout: output.stdout,
                stderr: output.stderr,
            })
            .map_err(|e| ServiceError::CommandFailed {
                command: cmd.to_string(),
                message: e.to_string(),
            });

        let duration_ms = duration_to_millis(start.elapsed());
        match &result {
            Ok(output) => ctx.emit(AppEvent::Platform(PlatformEvent::CommandCompleted {
                command: descriptor,
                exit_code: output.exit_code,
                duration_ms,
            })),
            Err(e) => ctx.emit(AppEvent::Platform(PlatformEvent::CommandFailed {
                command: descriptor,
                failure: FailureContext::from_error(e),
                duration_ms,
            })),
        }

        result
    }

    async fn spawn_detached(
        &self,
        ctx: &PlatformContext,
        cmd: PlatformCommand,
    ) -> Result<Option<u32>, ServiceError> {
        let descriptor = descriptor(&cmd);
        ctx.emit(AppEvent::Platform(PlatformEvent::CommandStarted {
            command: descriptor.clone(),
        }));

        // setsid(1) execs in place when its caller is not a group leader,
        // which a freshly spawned child never is, so the pid stays ours
        let mut command = Command::new(SETSID);
        command
            .arg(cmd.program())
            .args(cmd.get_args())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        if let Some(dir) = cmd.get_current_dir() {
            command.current_dir(dir);
        }

        match command.spawn() {
            Ok(mut child) => {
                let pid = child.id();
                // reap it whenever it exits
                tokio::spawn(async move {
                    let _ = child.wait().await;
                });
                Ok(pid)
            }
            Err(e) => {
                let error = ServiceError::CommandFailed {
                    command: cmd.to_string(),
                    message: e.to_string(),
                };
                ctx.emit(AppEvent::Platform(PlatformEvent::CommandFailed {
                    command: descriptor,
                    failure: FailureContext::from_error(&error),
                    duration_ms: 0,
                }));
                Err(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_exit_code_and_stdout() {
        let ops = TokioProcessOperations::new();
        let ctx = PlatformContext::default();
        let mut cmd = ops.create_command("sh");
        cmd.args(["-c", "echo hello; exit 3"]);

        let output = ops.execute_command(&ctx, cmd).await.unwrap();
        assert_eq!(output.exit_code, Some(3));
        assert!(!output.success());
        assert_eq!(output.stdout_lossy().trim(), "hello");
    }

    #[tokio::test]
    async fn missing_program_is_command_failed() {
        let ops = TokioProcessOperations::new();
        let ctx = PlatformContext::default();
        let cmd = ops.create_command("/nonexistent/hotswap-test-binary");

        let err = ops.execute_command(&ctx, cmd).await.unwrap_err();
        assert!(matches!(err, ServiceError::CommandFailed { .. }));
    }

    fn session_of(stat: &str) -> u32 {
        // fields after the parenthesised command name: state ppid pgrp session
        let (_, rest) = stat.rsplit_once(')').unwrap();
        rest.split_whitespace().nth(3).unwrap().parse().unwrap()
    }

    #[tokio::test]
    async fn detached_spawn_runs_in_its_own_session() {
        let temp = tempfile::TempDir::new().unwrap();
        let report = temp.path().join("stat");
        let ops = TokioProcessOperations::new();
        let ctx = PlatformContext::default();
        let mut cmd = ops.create_command("sh");
        cmd.args(["-c", "cat /proc/$$/stat > stat.tmp && mv stat.tmp stat"])
            .current_dir(temp.path());

        let pid = ops.spawn_detached(&ctx, cmd).await.unwrap().unwrap();

        let mut stat = None;
        for _ in 0..100 {
            if let Ok(contents) = std::fs::read_to_string(&report) {
                stat = Some(contents);
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        let stat = stat.expect("detached process never reported");
        let own = std::fs::read_to_string("/proc/self/stat").unwrap();

        assert!(stat.starts_with(&format!("{pid} ")));
        assert_ne!(session_of(&stat), session_of(&own));
        assert_eq!(session_of(&stat), pid);
    }

    #[tokio::test]
    async fn detached_spawn_in_missing_directory_fails() {
        let ops = TokioProcessOperations::new();
        let ctx = PlatformContext::default();
        let mut cmd = ops.create_command("sh");
        cmd.current_dir("/nonexistent/hotswap-test-dir");

        let err = ops.spawn_detached(&ctx, cmd).await.unwrap_err();
        assert!(matches!(err, ServiceError::CommandFailed { .. }));
    }
}
