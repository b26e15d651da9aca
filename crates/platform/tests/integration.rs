//! Integration tests for the systemd backend and service lookup

use async_trait::async_trait;
use hotswap_errors::ServiceError;
use hotswap_platform::*;
use hotswap_types::{LaunchSpec, ServiceAccount, ServiceIdentity};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const LISTING: &str = "\
agent.service           masked    enabled
agent-1.0.0.service     enabled   enabled
agent-1.1.0.service     enabled   enabled
agents.service          enabled   enabled
cron.service            enabled   enabled
";

/// Replays canned outputs keyed by a substring of the command line and
/// records everything it was asked to run.
#[derive(Default)]
struct ScriptedProcess {
    script: Vec<(&'static str, CommandOutput)>,
    hang_on: Option<&'static str>,
    calls: Mutex<Vec<String>>,
    unit_files: Mutex<Vec<String>>,
}

impl ScriptedProcess {
    fn with_listing(listing: &str) -> Self {
        Self {
            script: vec![("list-unit-files", ok(listing))],
            ..Self::default()
        }
    }

    fn respond(mut self, needle: &'static str, output: CommandOutput) -> Self {
        self.script.insert(0, (needle, output));
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

fn ok(stdout: &str) -> CommandOutput {
    CommandOutput {
        exit_code: Some(0),
        stdout: stdout.as_bytes().to_vec(),
        stderr: Vec::new(),
    }
}

fn fail(code: i32, stderr: &str) -> CommandOutput {
    CommandOutput {
        exit_code: Some(code),
        stdout: Vec::new(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

#[async_trait]
impl ProcessOperations for ScriptedProcess {
    async fn execute_command(
        &self,
        _ctx: &PlatformContext,
        cmd: PlatformCommand,
    ) -> Result<CommandOutput, ServiceError> {
        let line = cmd.to_string();
        self.calls.lock().unwrap().push(line.clone());

        // capture staged unit files before the caller deletes them
        let args = cmd.get_args();
        if let Some(pos) = args.iter().position(|a| a == "0644") {
            let staged = &args[pos + 1];
            let contents = std::fs::read_to_string(staged).unwrap();
            self.unit_files.lock().unwrap().push(contents);
        }

        if self.hang_on.is_some_and(|needle| line.contains(needle)) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }

        Ok(self
            .script
            .iter()
            .find(|(needle, _)| line.contains(needle))
            .map_or_else(|| ok(""), |(_, output)| output.clone()))
    }

    async fn spawn_detached(
        &self,
        _ctx: &PlatformContext,
        cmd: PlatformCommand,
    ) -> Result<Option<u32>, ServiceError> {
        self.calls.lock().unwrap().push(cmd.to_string());
        Ok(Some(4242))
    }
}

fn manager(process: &Arc<ScriptedProcess>, use_sudo: bool, root: bool) -> SystemdServiceManager {
    let ops: Arc<dyn ProcessOperations> = process.clone();
    SystemdServiceManager::new(ops, PlatformContext::default(), "/etc/systemd/system", use_sudo)
        .with_privileged(root)
}

fn identity(name: &str) -> ServiceIdentity {
    ServiceIdentity::new(name).unwrap()
}

#[tokio::test]
async fn lookup_takes_last_enabled_match() {
    let process = Arc::new(
        ScriptedProcess::with_listing(LISTING).respond("MainPID", ok("1234\n")),
    );
    let manager = manager(&process, true, true);

    let found = lookup(&manager, "agent", None).await.unwrap().unwrap();
    assert_eq!(found.name, "agent-1.1.0");
    assert_eq!(found.process_id, Some(1234));
}

#[tokio::test]
async fn lookup_honours_exclude_and_reports_stopped() {
    let process = Arc::new(ScriptedProcess::with_listing(LISTING).respond("MainPID", ok("0\n")));
    let manager = manager(&process, true, true);

    let found = lookup(&manager, "agent", Some("agent-1.1.0"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.name, "agent-1.0.0");
    assert_eq!(found.process_id, None);

    assert!(lookup(&manager, "nothing", None).await.unwrap().is_none());
}

#[tokio::test]
async fn install_writes_unit_then_reloads_and_enables() {
    let process = Arc::new(ScriptedProcess::with_listing(LISTING));
    let manager = manager(&process, true, true);
    let launch = LaunchSpec::new(
        "/var/lib/hotswap/app-2.0.0/hotswap",
        vec!["run".to_string()],
        ServiceAccount::LocalSystem,
    );

    manager
        .install(&identity("agent-2.0.0"), &launch, true)
        .await
        .unwrap();

    let calls = process.calls();
    assert!(calls[1].starts_with("install -m 0644 "));
    assert!(calls[1].ends_with(" /etc/systemd/system/agent-2.0.0.service"));
    assert_eq!(calls[2], "systemctl daemon-reload");
    assert_eq!(calls[3], "systemctl enable agent-2.0.0.service");

    let units = process.unit_files.lock().unwrap();
    assert!(units[0].contains("ExecStart=/var/lib/hotswap/app-2.0.0/hotswap run"));
}

#[tokio::test]
async fn install_of_registered_name_is_rejected() {
    let process = Arc::new(ScriptedProcess::with_listing(LISTING));
    let manager = manager(&process, true, true);
    let launch = LaunchSpec::new("/bin/true", Vec::new(), ServiceAccount::LocalSystem);

    let err = manager
        .install(&identity("agent-1.0.0"), &launch, true)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::AlreadyInstalled { .. }));
    assert_eq!(process.calls().len(), 1);
}

#[tokio::test]
async fn elevation_without_sudo_is_required() {
    let process = Arc::new(ScriptedProcess::with_listing(LISTING));
    let manager = manager(&process, false, false);

    let err = manager
        .uninstall(&identity("agent-1.0.0"), true)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ElevationRequired { .. }));
}

#[tokio::test]
async fn non_root_commands_go_through_sudo() {
    let process = Arc::new(ScriptedProcess::with_listing(LISTING));
    let manager = manager(&process, true, false);

    manager.start(&identity("agent-1.0.0")).await.unwrap();
    assert_eq!(
        process.calls().last().unwrap(),
        "sudo -n systemctl start agent-1.0.0.service"
    );
}

#[tokio::test]
async fn sudo_password_prompt_is_permission_denied() {
    let process = Arc::new(
        ScriptedProcess::with_listing(LISTING)
            .respond("sudo -n systemctl disable", fail(1, "sudo: a password is required")),
    );
    let manager = manager(&process, true, false);

    let err = manager
        .uninstall(&identity("agent-1.0.0"), true)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::PermissionDenied { .. }));
}

#[tokio::test]
async fn start_failure_carries_stderr() {
    let process = Arc::new(
        ScriptedProcess::with_listing(LISTING)
            .respond("systemctl start", fail(1, "Job for agent-1.0.0.service failed")),
    );
    let manager = manager(&process, true, true);

    match manager.start(&identity("agent-1.0.0")).await {
        Err(ServiceError::StartFailed { name, message }) => {
            assert_eq!(name, "agent-1.0.0");
            assert!(message.contains("Job for"));
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn stop_of_unknown_service_is_not_installed() {
    let process = Arc::new(ScriptedProcess::with_listing(LISTING));
    let manager = manager(&process, true, true);

    let err = manager
        .stop(&identity("agent-9.9.9"), Duration::from_secs(5))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotInstalled { .. }));
}

#[tokio::test(start_paused = true)]
async fn hung_stop_times_out() {
    let process = Arc::new(ScriptedProcess {
        hang_on: Some("systemctl stop"),
        ..ScriptedProcess::with_listing(LISTING)
    });
    let manager = manager(&process, true, true);

    let err = manager
        .stop(&identity("agent-1.0.0"), Duration::from_secs(5))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::StopTimedOut {
            timeout_secs: 5,
            ..
        }
    ));
}

#[tokio::test]
async fn kill_failure_is_reported() {
    let process = Arc::new(
        ScriptedProcess::with_listing(LISTING).respond("kill -KILL", fail(1, "No such process")),
    );
    let manager = manager(&process, true, true);

    let err = manager.kill_process(99).await.unwrap_err();
    assert!(matches!(err, ServiceError::KillFailed { pid: 99, .. }));
}
