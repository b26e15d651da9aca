//! Integration tests for the directory release feed

use async_trait::async_trait;
use hotswap_errors::{ServiceError, UpdateError};
use hotswap_feed::*;
use hotswap_platform::{CommandOutput, PlatformCommand, PlatformContext, ProcessOperations};
use hotswap_types::ReleaseVersion;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

#[derive(Default)]
struct RecordingProcess {
    spawned: Mutex<Vec<PlatformCommand>>,
}

#[async_trait]
impl ProcessOperations for RecordingProcess {
    async fn execute_command(
        &self,
        _ctx: &PlatformContext,
        _cmd: PlatformCommand,
    ) -> Result<CommandOutput, ServiceError> {
        Ok(CommandOutput::default())
    }

    async fn spawn_detached(
        &self,
        _ctx: &PlatformContext,
        cmd: PlatformCommand,
    ) -> Result<Option<u32>, ServiceError> {
        self.spawned.lock().unwrap().push(cmd);
        Ok(Some(1))
    }
}

fn write_release(feed: &Path, version: &str) {
    let dir = feed.join(format!("agent-{version}"));
    std::fs::create_dir_all(dir.join("lib")).unwrap();
    std::fs::write(dir.join("hotswap"), format!("binary {version}")).unwrap();
    std::fs::write(dir.join("lib").join("payload.so"), "payload").unwrap();
}

fn setup(versions: &[&str]) -> (TempDir, TempDir) {
    let feed = TempDir::new().unwrap();
    let root = TempDir::new().unwrap();
    let entries: Vec<String> = versions
        .iter()
        .map(|v| {
            write_release(feed.path(), v);
            format!(r#"{{"version": "{v}", "path": "agent-{v}"}}"#)
        })
        .collect();
    std::fs::write(
        feed.path().join("releases.json"),
        format!(r#"{{"releases": [{}]}}"#, entries.join(",")),
    )
    .unwrap();
    (feed, root)
}

fn feed(feed: &TempDir, root: &TempDir, process: &Arc<RecordingProcess>, current: &str) -> DirectoryFeed {
    let ops: Arc<dyn ProcessOperations> = process.clone();
    DirectoryFeed::new(feed.path(), root.path(), "hotswap", ops, PlatformContext::default())
        .with_current_version(Some(ReleaseVersion::parse(current).unwrap()))
}

#[tokio::test]
async fn check_reports_newer_releases() {
    let (feed_dir, root) = setup(&["1.0.0", "1.1.0", "1.2.0"]);
    let process = Arc::new(RecordingProcess::default());
    let source = feed(&feed_dir, &root, &process, "1.0.0");

    let info = source.check_for_update().await.unwrap();
    assert!(info.has_update());
    assert_eq!(info.future_version().to_string(), "1.2.0");
    assert_eq!(info.releases_to_apply.len(), 2);
}

#[tokio::test]
async fn check_when_current_is_latest() {
    let (feed_dir, root) = setup(&["1.0.0"]);
    let process = Arc::new(RecordingProcess::default());
    let source = feed(&feed_dir, &root, &process, "1.0.0");

    let info = source.check_for_update().await.unwrap();
    assert!(!info.has_update());
    assert!(info.releases_to_apply.is_empty());
}

#[tokio::test]
async fn missing_manifest_is_feed_not_found() {
    let feed_dir = TempDir::new().unwrap();
    let root = TempDir::new().unwrap();
    let process = Arc::new(RecordingProcess::default());
    let source = feed(&feed_dir, &root, &process, "1.0.0");

    let err = source.check_for_update().await.unwrap_err();
    assert!(matches!(err, UpdateError::FeedNotFound { .. }));
}

#[tokio::test]
async fn download_then_apply_promotes_and_relaunches() {
    let (feed_dir, root) = setup(&["1.0.0", "1.1.0", "1.2.0"]);
    let process = Arc::new(RecordingProcess::default());
    let source = feed(&feed_dir, &root, &process, "1.0.0");

    let info = source.check_for_update().await.unwrap();
    source.download_releases(&info.releases_to_apply).await.unwrap();
    assert!(root.path().join("packages/1.2.0/lib/payload.so").exists());

    let applied = source.apply_releases(&info).await.unwrap();
    assert_eq!(applied.to_string(), "1.2.0");

    let app_dir = root.path().join("app-1.2.0");
    assert_eq!(
        std::fs::read_to_string(app_dir.join("hotswap")).unwrap(),
        "binary 1.2.0"
    );
    assert!(!root.path().join("packages/1.2.0").exists());
    assert!(!root.path().join("packages/1.1.0").exists());

    let spawned = process.spawned.lock().unwrap();
    assert_eq!(spawned.len(), 1);
    assert_eq!(
        Path::new(spawned[0].program()),
        app_dir.join("hotswap").as_path()
    );
    assert_eq!(spawned[0].get_args(), &["updated", "1.2.0"]);
}

#[tokio::test]
async fn apply_without_download_is_not_staged() {
    let (feed_dir, root) = setup(&["1.0.0", "2.0.0"]);
    let process = Arc::new(RecordingProcess::default());
    let source = feed(&feed_dir, &root, &process, "1.0.0");

    let info = source.check_for_update().await.unwrap();
    let err = source.apply_releases(&info).await.unwrap_err();
    assert!(matches!(err, UpdateError::NotStaged { .. }));
    assert!(process.spawned.lock().unwrap().is_empty());
}

#[tokio::test]
async fn relaunch_under_systemd_goes_through_a_transient_unit() {
    let (feed_dir, root) = setup(&["1.0.0", "1.2.0"]);
    let process = Arc::new(RecordingProcess::default());
    let source = feed(&feed_dir, &root, &process, "1.0.0").with_transient_relaunch("agent", true);

    let info = source.check_for_update().await.unwrap();
    source.download_releases(&info.releases_to_apply).await.unwrap();
    source.apply_releases(&info).await.unwrap();

    let app_dir = root.path().join("app-1.2.0");
    let exe = app_dir.join("hotswap");
    let spawned = process.spawned.lock().unwrap();
    assert_eq!(spawned[0].program(), "sudo");
    assert_eq!(
        spawned[0].get_args(),
        &[
            "-n".to_string(),
            "systemd-run".to_string(),
            "--unit=relaunch-agent-1.2.0".to_string(),
            "--collect".to_string(),
            "--quiet".to_string(),
            format!("--working-directory={}", app_dir.display()),
            exe.to_string_lossy().into_owned(),
            "updated".to_string(),
            "1.2.0".to_string(),
        ]
    );
}

fn session_of(stat: &str) -> u32 {
    // fields after the parenthesised command name: state ppid pgrp session
    let (_, rest) = stat.rsplit_once(')').unwrap();
    rest.split_whitespace().nth(3).unwrap().parse().unwrap()
}

#[cfg(unix)]
#[tokio::test]
async fn applied_release_is_relaunched_outside_our_session() {
    use std::os::unix::fs::PermissionsExt;

    let (feed_dir, root) = setup(&["1.0.0", "1.2.0"]);
    let script = feed_dir.path().join("agent-1.2.0").join("hotswap");
    std::fs::write(
        &script,
        "#!/bin/sh\necho \"$@\" > ../relaunched.args\ncat /proc/$$/stat > ../relaunched.tmp && mv ../relaunched.tmp ../relaunched.stat\n",
    )
    .unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

    let ops: Arc<dyn ProcessOperations> = Arc::new(hotswap_platform::TokioProcessOperations::new());
    let source = DirectoryFeed::new(feed_dir.path(), root.path(), "hotswap", ops, PlatformContext::default())
        .with_current_version(Some(ReleaseVersion::parse("1.0.0").unwrap()));

    let info = source.check_for_update().await.unwrap();
    source.download_releases(&info.releases_to_apply).await.unwrap();
    source.apply_releases(&info).await.unwrap();

    let report = root.path().join("relaunched.stat");
    let mut stat = None;
    for _ in 0..100 {
        if let Ok(contents) = std::fs::read_to_string(&report) {
            stat = Some(contents);
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }
    let stat = stat.expect("relaunched release never ran");
    let own = std::fs::read_to_string("/proc/self/stat").unwrap();

    assert_ne!(session_of(&stat), session_of(&own));
    assert_eq!(
        std::fs::read_to_string(root.path().join("relaunched.args")).unwrap().trim(),
        "updated 1.2.0"
    );
}
