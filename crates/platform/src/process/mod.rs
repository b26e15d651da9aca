//! Process execution operations

use async_trait::async_trait;
use hotswap_errors::ServiceError;
use std::fmt;
use std::path::PathBuf;

use crate::core::PlatformContext;

/// Platform-specific command builder and execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformCommand {
    program: String,
    args: Vec<String>,
    current_dir: Option<PathBuf>,
}

impl PlatformCommand {
    /// Create a new platform command
    #[must_use]
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: Vec::new(),
            current_dir: None,
        }
    }

    /// Add an argument to the command
    pub fn arg<S: AsRef<str>>(&mut self, arg: S) -> &mut Self {
        self.args.push(arg.as_ref().to_string());
        self
    }

    /// Add multiple arguments to the command
    pub fn args<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for arg in args {
            self.args.push(arg.as_ref().to_string());
        }
        self
    }

    /// Set the working directory for the command
    pub fn current_dir<P: Into<PathBuf>>(&mut self, dir: P) -> &mut Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Wrap this command so it runs through `sudo -n`
    #[must_use]
    pub fn with_sudo(self) -> Self {
        let mut args = Vec::with_capacity(self.args.len() + 2);
        args.push("-n".to_string());
        args.push(self.program);
        args.extend(self.args);
        Self {
            program: "sudo".to_string(),
            args,
            current_dir: self.current_dir,
        }
    }

    /// Wrap this command so it runs as its own transient systemd unit.
    ///
    /// A process started from inside a service shares that service's
    /// cgroup and dies with it when the unit is stopped; `systemd-run`
    /// hands the command to the service manager instead. `--collect` drops
    /// the unit once it exits, failed or not.
    #[must_use]
    pub fn in_transient_unit(self, unit: &str) -> Self {
        let mut args = vec![
            format!("--unit={unit}"),
            "--collect".to_string(),
            "--quiet".to_string(),
        ];
        if let Some(dir) = &self.current_dir {
            args.push(format!("--working-directory={}", dir.display()));
        }
        args.push(self.program);
        args.extend(self.args);
        Self {
            program: "systemd-run".to_string(),
            args,
            current_dir: self.current_dir,
        }
    }

    /// Get the program name
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Get the arguments
    #[must_use]
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Get the current directory
    #[must_use]
    pub fn get_current_dir(&self) -> Option<&PathBuf> {
        self.current_dir.as_ref()
    }
}

impl fmt::Display for PlatformCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Output from command execution
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    /// `None` when the process was killed by a signal
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    #[must_use]
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    #[must_use]
    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim().to_string()
    }
}

/// Trait for process execution operations
#[async_trait]
pub trait ProcessOperations: Send + Sync {
    /// Execute a command to completion and return the output
    async fn execute_command(
        &self,
        ctx: &PlatformContext,
        cmd: PlatformCommand,
    ) -> Result<CommandOutput, ServiceError>;

    /// Start a command without waiting for it, in a session of its own so
    /// signals aimed at the caller's process group do not reach it.
    /// Returns its pid when known.
    async fn spawn_detached(
        &self,
        ctx: &PlatformContext,
        cmd: PlatformCommand,
    ) -> Result<Option<u32>, ServiceError>;

    /// Create a new command builder
    fn create_command(&self, program: &str) -> PlatformCommand {
        PlatformCommand::new(program)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sudo_wrapping_keeps_argument_order() {
        let mut cmd = PlatformCommand::new("systemctl");
        cmd.args(["start", "agent-1.0.service"]);
        let wrapped = cmd.with_sudo();

        assert_eq!(wrapped.program(), "sudo");
        assert_eq!(
            wrapped.get_args(),
            &["-n", "systemctl", "start", "agent-1.0.service"]
        );
        assert_eq!(wrapped.to_string(), "sudo -n systemctl start agent-1.0.service");
    }

    #[test]
    fn transient_unit_wrapping_carries_working_directory() {
        let mut cmd = PlatformCommand::new("/opt/agent/app-1.2.0/hotswap");
        cmd.args(["updated", "1.2.0"]).current_dir("/opt/agent/app-1.2.0");
        let wrapped = cmd.in_transient_unit("relaunch-agent-1.2.0");

        assert_eq!(wrapped.program(), "systemd-run");
        assert_eq!(
            wrapped.get_args(),
            &[
                "--unit=relaunch-agent-1.2.0",
                "--collect",
                "--quiet",
                "--working-directory=/opt/agent/app-1.2.0",
                "/opt/agent/app-1.2.0/hotswap",
                "updated",
                "1.2.0",
            ]
        );
    }
}
