//! systemd service manager backend

use async_trait::async_trait;
use hotswap_errors::ServiceError;
use hotswap_types::{LaunchSpec, ServiceEntry, ServiceIdentity, StartMode};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

use super::unit::{render_unit, service_name, unit_name};
use crate::core::PlatformContext;
use crate::process::{CommandOutput, PlatformCommand, ProcessOperations};
use crate::service::ServiceManager;

const SYSTEMCTL: &str = "systemctl";

/// sudo refuses to prompt under `-n`; these are its messages for that case
const SUDO_DENIED: [&str; 3] = [
    "a password is required",
    "is not in the sudoers file",
    "is not allowed to run",
];

/// Drives systemd through `systemctl` and unit files in `unit_dir`
pub struct SystemdServiceManager {
    process: Arc<dyn ProcessOperations>,
    ctx: PlatformContext,
    unit_dir: PathBuf,
    use_sudo: bool,
    privileged: OnceCell<bool>,
}

impl SystemdServiceManager {
    #[must_use]
    pub fn new(
        process: Arc<dyn ProcessOperations>,
        ctx: PlatformContext,
        unit_dir: impl Into<PathBuf>,
        use_sudo: bool,
    ) -> Self {
        Self {
            process,
            ctx,
            unit_dir: unit_dir.into(),
            use_sudo,
            privileged: OnceCell::new(),
        }
    }

    /// Skip root detection and use the given answer
    #[must_use]
    pub fn with_privileged(self, privileged: bool) -> Self {
        Self {
            privileged: OnceCell::new_with(Some(privileged)),
            ..self
        }
    }

    async fn is_privileged(&self) -> bool {
        *self
            .privileged
            .get_or_init(|| async {
                let mut cmd = self.process.create_command("id");
                cmd.arg("-u");
                match self.process.execute_command(&self.ctx, cmd).await {
                    Ok(output) => output.success() && output.stdout_lossy().trim() == "0",
                    Err(_) => false,
                }
            })
            .await
    }

    /// Apply the escalation policy to a command that needs root.
    ///
    /// `required` commands fail with `ElevationRequired` when we are not
    /// root and sudo is disabled; the others run as-is and let the service
    /// manager decide.
    async fn escalate(
        &self,
        cmd: PlatformCommand,
        operation: &str,
        required: bool,
    ) -> Result<PlatformCommand, ServiceError> {
        if self.is_privileged().await {
            Ok(cmd)
        } else if self.use_sudo {
            Ok(cmd.with_sudo())
        } else if required {
            Err(ServiceError::ElevationRequired {
                operation: operation.to_string(),
            })
        } else {
            Ok(cmd)
        }
    }

    fn systemctl<I, S>(&self, args: I) -> PlatformCommand
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut cmd = self.process.create_command(SYSTEMCTL);
        cmd.args(args);
        cmd
    }

    /// Run a command; a non-zero exit becomes `on_failure(stderr)` unless
    /// sudo refused to escalate, which is `PermissionDenied`.
    async fn run_checked(
        &self,
        cmd: PlatformCommand,
        operation: &str,
        on_failure: impl FnOnce(String) -> ServiceError + Send,
    ) -> Result<CommandOutput, ServiceError> {
        let via_sudo = cmd.program() == "sudo";
        let output = self.process.execute_command(&self.ctx, cmd).await?;
        if output.success() {
            return Ok(output);
        }

        let stderr = output.stderr_lossy();
        if via_sudo && SUDO_DENIED.iter().any(|m| stderr.contains(m)) {
            return Err(ServiceError::PermissionDenied {
                operation: operation.to_string(),
                message: stderr,
            });
        }
        Err(on_failure(stderr))
    }

    async fn is_installed(&self, name: &str) -> Result<bool, ServiceError> {
        Ok(self
            .list_services()
            .await?
            .iter()
            .any(|entry| entry.name == name))
    }

    async fn daemon_reload(&self, operation: &str, elevate: bool) -> Result<(), ServiceError> {
        let cmd = self
            .escalate(self.systemctl(["daemon-reload"]), operation, elevate)
            .await?;
        self.run_checked(cmd, operation, |message| ServiceError::CommandFailed {
            command: "systemctl daemon-reload".to_string(),
            message,
        })
        .await
        .map(|_| ())
    }
}

/// Whether this process was started by systemd as part of a unit
#[must_use]
pub fn running_under_systemd() -> bool {
    std::env::var_os("INVOCATION_ID").is_some()
}

/// Map a `list-unit-files` state column onto a start mode
fn start_mode(state: &str) -> StartMode {
    match state {
        "enabled" | "enabled-runtime" => StartMode::Auto,
        "masked" | "masked-runtime" | "bad" => StartMode::Disabled,
        _ => StartMode::Manual,
    }
}

/// Parse `systemctl list-unit-files --type=service --no-legend` output
#[must_use]
pub fn parse_unit_files(stdout: &str) -> Vec<ServiceEntry> {
    stdout
        .lines()
        .filter_map(|line| {
            let mut columns = line.split_whitespace();
            let unit = columns.next()?;
            let state = columns.next().unwrap_or("");
            // transient units (our own relaunches among them) are never
            // registered services
            if !unit.ends_with(".service") || state == "transient" {
                return None;
            }
            let name = service_name(unit);
            // templates cannot be started without an instance
            if name.is_empty() || name.ends_with('@') {
                return None;
            }
            Some(ServiceEntry {
                name: name.to_string(),
                start_mode: start_mode(state),
            })
        })
        .collect()
}

#[async_trait]
impl ServiceManager for SystemdServiceManager {
    async fn list_services(&self) -> Result<Vec<ServiceEntry>, ServiceError> {
        let cmd = self.systemctl([
            "list-unit-files",
            "--type=service",
            "--no-legend",
            "--no-pager",
            "--plain",
        ]);
        let output = self
            .run_checked(cmd, "list services", |message| ServiceError::QueryFailed {
                message,
            })
            .await?;
        Ok(parse_unit_files(&output.stdout_lossy()))
    }

    async fn process_id(&self, name: &str) -> Result<Option<u32>, ServiceError> {
        let cmd = self.systemctl(["show", "-p", "MainPID", "--value", unit_name(name).as_str()]);
        let output = self
            .run_checked(cmd, "query pid", |message| ServiceError::QueryFailed {
                message,
            })
            .await?;
        let raw = output.stdout_lossy();
        let pid: u32 = raw.trim().parse().map_err(|_| ServiceError::QueryFailed {
            message: format!("unexpected MainPID value '{}'", raw.trim()),
        })?;
        Ok((pid != 0).then_some(pid))
    }

    async fn install(
        &self,
        identity: &ServiceIdentity,
        launch: &LaunchSpec,
        elevate: bool,
    ) -> Result<(), ServiceError> {
        let name = identity.name();
        if self.is_installed(name).await? {
            return Err(ServiceError::AlreadyInstalled {
                name: name.to_string(),
            });
        }

        let operation = format!("install {name}");
        let staged = tempfile::Builder::new()
            .prefix("hotswap-unit-")
            .tempfile()
            .map_err(|e| ServiceError::CommandFailed {
                command: "create unit file".to_string(),
                message: e.to_string(),
            })?;
        tokio::fs::write(staged.path(), render_unit(identity, launch))
            .await
            .map_err(|e| ServiceError::CommandFailed {
                command: "write unit file".to_string(),
                message: e.to_string(),
            })?;

        let target = self.unit_dir.join(unit_name(name));
        let mut copy = self.process.create_command("install");
        copy.args(["-m", "0644"])
            .arg(staged.path().to_string_lossy())
            .arg(target.to_string_lossy());
        let copy = self.escalate(copy, &operation, elevate).await?;
        self.run_checked(copy, &operation, |message| ServiceError::CommandFailed {
            command: format!("install unit {}", target.display()),
            message,
        })
        .await?;

        self.daemon_reload(&operation, elevate).await?;

        let enable = self
            .escalate(self.systemctl(["enable", unit_name(name).as_str()]), &operation, elevate)
            .await?;
        self.run_checked(enable, &operation, |message| ServiceError::CommandFailed {
            command: format!("systemctl enable {name}"),
            message,
        })
        .await?;
        Ok(())
    }

    async fn uninstall(
        &self,
        identity: &ServiceIdentity,
        elevate: bool,
    ) -> Result<(), ServiceError> {
        let name = identity.name();
        if !self.is_installed(name).await? {
            return Err(ServiceError::NotInstalled {
                name: name.to_string(),
            });
        }

        let operation = format!("uninstall {name}");
        let disable = self
            .escalate(self.systemctl(["disable", unit_name(name).as_str()]), &operation, elevate)
            .await?;
        self.run_checked(disable, &operation, |message| ServiceError::CommandFailed {
            command: format!("systemctl disable {name}"),
            message,
        })
        .await?;

        let target = self.unit_dir.join(unit_name(name));
        let mut remove = self.process.create_command("rm");
        remove.arg("-f").arg(target.to_string_lossy());
        let remove = self.escalate(remove, &operation, elevate).await?;
        self.run_checked(remove, &operation, |message| ServiceError::CommandFailed {
            command: format!("remove unit {}", target.display()),
            message,
        })
        .await?;

        self.daemon_reload(&operation, elevate).await
    }

    async fn start(&self, identity: &ServiceIdentity) -> Result<(), ServiceError> {
        let name = identity.name();
        if !self.is_installed(name).await? {
            return Err(ServiceError::NotInstalled {
                name: name.to_string(),
            });
        }

        let operation = format!("start {name}");
        let cmd = self
            .escalate(self.systemctl(["start", unit_name(name).as_str()]), &operation, false)
            .await?;
        self.run_checked(cmd, &operation, |message| ServiceError::StartFailed {
            name: name.to_string(),
            message,
        })
        .await
        .map(|_| ())
    }

    async fn stop(&self, identity: &ServiceIdentity, timeout: Duration) -> Result<(), ServiceError> {
        let name = identity.name();
        if !self.is_installed(name).await? {
            return Err(ServiceError::NotInstalled {
                name: name.to_string(),
            });
        }

        let operation = format!("stop {name}");
        let cmd = self
            .escalate(self.systemctl(["stop", unit_name(name).as_str()]), &operation, false)
            .await?;
        let stop = self.run_checked(cmd, &operation, |message| ServiceError::StopFailed {
            name: name.to_string(),
            message,
        });

        match tokio::time::timeout(timeout, stop).await {
            Ok(result) => result.map(|_| ()),
            Err(_) => Err(ServiceError::StopTimedOut {
                name: name.to_string(),
                timeout_secs: timeout.as_secs(),
            }),
        }
    }

    async fn kill_process(&self, pid: u32) -> Result<(), ServiceError> {
        let mut cmd = self.process.create_command("kill");
        cmd.args(["-KILL", pid.to_string().as_str()]);
        let operation = format!("kill {pid}");
        let cmd = self.escalate(cmd, &operation, false).await?;
        self.run_checked(cmd, &operation, |message| ServiceError::KillFailed {
            pid,
            message,
        })
        .await
        .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_unit_file_listing() {
        let listing = "\
agent-1.0.0.service                 enabled         enabled
agent-1.1.0.service                 masked          enabled
getty@.service                      enabled         enabled
cron.service                        disabled        enabled
relaunch-agent-1.2.0.service        transient       -
dbus.socket                         static          -
";
        let entries = parse_unit_files(listing);
        assert_eq!(
            entries,
            vec![
                ServiceEntry {
                    name: "agent-1.0.0".to_string(),
                    start_mode: StartMode::Auto,
                },
                ServiceEntry {
                    name: "agent-1.1.0".to_string(),
                    start_mode: StartMode::Disabled,
                },
                ServiceEntry {
                    name: "cron".to_string(),
                    start_mode: StartMode::Manual,
                },
            ]
        );
    }
}
