use std::time::Duration;

use tokio::{
    sync::watch,
    time::{MissedTickBehavior, interval},
};
use tracing::{info, warn};

use super::api::AnalysisApi;
use crate::config::MIN_HEALTH_INTERVAL;

/// Connection indicator shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthState {
    Unknown,
    Connected,
    Disconnected(String),
}

impl HealthState {
    pub fn is_connected(&self) -> bool {
        matches!(self, HealthState::Connected)
    }
}

/// One health check. Only `{status: "healthy"}` counts as connected.
pub async fn check<B: AnalysisApi>(backend: &B) -> HealthState {
    match backend.health().await {
        Ok(report) if report.status == "healthy" => HealthState::Connected,
        Ok(report) => HealthState::Disconnected(format!("backend status '{}'", report.status)),
        Err(e) => HealthState::Disconnected(e.to_string()),
    }
}

/// Polls the backend on a fixed interval and publishes the indicator.
///
/// The monitor only sees the backend, never the session state, so polling
/// cannot interfere with the open project or the file cache.
#[derive(Debug)]
pub struct HealthMonitor {
    interval: Duration,
    sender: watch::Sender<HealthState>,
}

impl HealthMonitor {
    /// Intervals below [`MIN_HEALTH_INTERVAL`] are raised to it.
    pub fn new(interval: Duration) -> (Self, watch::Receiver<HealthState>) {
        let (sender, receiver) = watch::channel(HealthState::Unknown);
        let interval = interval.max(MIN_HEALTH_INTERVAL);
        (Self { interval, sender }, receiver)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn subscribe(&self) -> watch::Receiver<HealthState> {
        self.sender.subscribe()
    }

    /// Probes immediately, then once per interval. Returns when every receiver is gone.
    pub async fn run<B: AnalysisApi>(&self, backend: &B) {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if self.sender.is_closed() {
                break;
            }
            let state = check(backend).await;
            self.sender.send_if_modified(|current| {
                if *current == state {
                    return false;
                }
                match &state {
                    HealthState::Connected => info!("backend connected"),
                    HealthState::Disconnected(reason) => warn!(%reason, "backend disconnected"),
                    HealthState::Unknown => {}
                }
                *current = state;
                true
            });
        }
    }
}
