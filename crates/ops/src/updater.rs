//! Background polling updater

use hotswap_events::{AppEvent, EventEmitter, EventSender, FailureContext, UpdaterEvent};
use hotswap_feed::UpdateSource;
use hotswap_types::ReleaseVersion;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Default time between update checks
pub const DEFAULT_CHECK_PERIOD: Duration = Duration::from_secs(30);

/// What one polling tick did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    CheckFailed,
    UpToDate,
    Applied(ReleaseVersion),
    ApplyFailed(ReleaseVersion),
}

/// Periodically asks an update source for a newer release and applies it
pub struct PollingUpdater {
    source: Arc<dyn UpdateSource>,
    check_period: Duration,
    current_version: Option<ReleaseVersion>,
    tx: EventSender,
}

impl PollingUpdater {
    #[must_use]
    pub fn new(source: Arc<dyn UpdateSource>, tx: EventSender) -> Self {
        Self {
            source,
            check_period: DEFAULT_CHECK_PERIOD,
            current_version: None,
            tx,
        }
    }

    #[must_use]
    pub fn with_check_period(mut self, check_period: Duration) -> Self {
        self.check_period = check_period;
        self
    }

    /// Version reported in events when the source cannot be reached
    #[must_use]
    pub fn with_current_version(mut self, current_version: Option<ReleaseVersion>) -> Self {
        self.current_version = current_version;
        self
    }

    #[must_use]
    pub fn check_period(&self) -> Duration {
        self.check_period
    }

    fn current_label(&self) -> String {
        self.current_version.clone().unwrap_or_default().to_string()
    }

    /// One check-and-apply cycle. Every failure is reported and absorbed.
    pub async fn tick(&self) -> TickOutcome {
        let info = match self.source.check_for_update().await {
            Ok(info) => info,
            Err(error) => {
                self.emit(AppEvent::Updater(UpdaterEvent::CheckFailed {
                    current_version: self.current_label(),
                    failure: FailureContext::from_error(&error),
                }));
                return TickOutcome::CheckFailed;
            }
        };

        let installed = info.installed_version();
        let latest = info.future_version();
        if !info.has_update() {
            self.emit(AppEvent::Updater(UpdaterEvent::UpToDate {
                installed: installed.to_string(),
                latest: latest.to_string(),
            }));
            return TickOutcome::UpToDate;
        }

        self.emit(AppEvent::Updater(UpdaterEvent::UpdateFound {
            installed: installed.to_string(),
            latest: latest.to_string(),
        }));

        let applied = match self.source.download_releases(&info.releases_to_apply).await {
            Ok(()) => self.source.apply_releases(&info).await,
            Err(error) => Err(error),
        };

        match applied {
            Ok(version) => {
                self.emit(AppEvent::Updater(UpdaterEvent::Applied {
                    version: version.to_string(),
                }));
                TickOutcome::Applied(version)
            }
            Err(error) => {
                self.emit(AppEvent::Updater(UpdaterEvent::ApplyFailed {
                    version: latest.to_string(),
                    failure: FailureContext::from_error(&error),
                }));
                TickOutcome::ApplyFailed(latest)
            }
        }
    }

    /// Sleep, tick, repeat. Never returns.
    pub async fn run(self) {
        self.emit(AppEvent::Updater(UpdaterEvent::LoopStarted {
            current_version: self.current_label(),
            check_period: self.check_period,
        }));
        loop {
            tokio::time::sleep(self.check_period).await;
            self.tick().await;
        }
    }

    /// Start the loop in the background unless the process is attended.
    ///
    /// The returned handle is only for aborting the loop at shutdown; the
    /// loop itself never finishes.
    #[must_use]
    pub fn spawn(self, attended: bool) -> Option<JoinHandle<()>> {
        if attended {
            self.emit(AppEvent::Updater(UpdaterEvent::SkippedAttended {
                current_version: self.current_label(),
            }));
            return None;
        }
        Some(tokio::spawn(self.run()))
    }
}

impl EventEmitter for PollingUpdater {
    fn event_sender(&self) -> Option<&EventSender> {
        Some(&self.tx)
    }
}
