//! Synthetic event generator
//!
//! Periodically pushes jittered dashboard metrics to every connection, and
//! occasionally an activity entry, so the dashboard looks alive without a
//! real scanning engine behind it.

use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use tokio::sync::watch;
use tokio::time::interval;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{ActivityItem, DashboardMetrics, ServerEvent, Severity};

use super::state::{MockState, RoomEvent};

/// Generator configuration
#[derive(Clone)]
pub struct SyntheticConfig {
    /// Interval between metrics pushes
    pub metrics_interval: Duration,
    /// One activity event is emitted roughly every N metrics ticks
    pub activity_every: u32,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            metrics_interval: Duration::from_secs(2),
            activity_every: 5,
        }
    }
}

/// Synthetic metrics/activity generator
pub struct SyntheticGenerator {
    state: MockState,
    config: SyntheticConfig,
}

impl SyntheticGenerator {
    pub fn new(state: MockState, config: SyntheticConfig) -> Self {
        Self { state, config }
    }

    /// Run the generator (call in a spawned task)
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = self.config.metrics_interval.as_secs(),
            "starting synthetic event generator"
        );

        let mut tick = interval(self.config.metrics_interval);
        let mut ticks: u32 = 0;

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    ticks = ticks.wrapping_add(1);
                    self.emit_metrics();
                    if self.config.activity_every > 0
                        && ticks % self.config.activity_every == 0
                    {
                        self.emit_activity();
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("synthetic generator shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// Push the computed metrics with a little random jitter
    fn emit_metrics(&self) {
        let mut metrics = self.state.metrics();
        let mut rng = rand::thread_rng();

        metrics.compliance_score =
            (metrics.compliance_score + rng.gen_range(-2..=2)).clamp(0, 100);
        metrics.audit_coverage = (metrics.audit_coverage + rng.gen_range(-3..=3)).clamp(0, 100);

        debug!("pushing synthetic metrics");
        self.state
            .emit(RoomEvent::broadcast(ServerEvent::MetricsUpdated(metrics)));
    }

    fn emit_activity(&self) {
        let mut rng = rand::thread_rng();
        let (kind, title, description, severity) = match rng.gen_range(0..4) {
            0 => (
                "login",
                "User logged in",
                "auditor signed in from 10.0.5.12",
                Severity::Info,
            ),
            1 => (
                "scan",
                "Scheduled scan started",
                "Nightly scan of the server group",
                Severity::Info,
            ),
            2 => (
                "vulnerability",
                "Finding updated",
                "Unpatched kernel on db-01 moved to remediation",
                Severity::Medium,
            ),
            _ => (
                "audit",
                "Audit note added",
                "Evidence attached to Q3 infrastructure audit",
                Severity::Low,
            ),
        };

        let item = ActivityItem {
            id: Uuid::new_v4().to_string(),
            kind: kind.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            timestamp: Utc::now(),
            user: "system".to_string(),
            severity,
        };

        self.state.db.push_activity(item.clone());
        self.state
            .emit(RoomEvent::broadcast(ServerEvent::ActivityNew(item)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_generator_pushes_metrics_and_stops_on_shutdown() {
        let state = MockState::new("test-secret");
        let mut events_rx = state.events_tx.subscribe();

        let generator = SyntheticGenerator::new(
            state.clone(),
            SyntheticConfig {
                metrics_interval: Duration::from_millis(10),
                activity_every: 0,
            },
        );
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(async move { generator.run(shutdown_rx).await });

        let event = tokio::time::timeout(Duration::from_secs(5), events_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(event.event, ServerEvent::MetricsUpdated(_)));
        assert!(event.room.is_none());

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
    }

    #[test]
    fn test_jitter_keeps_scores_in_range() {
        let state = MockState::new("test-secret");
        let generator = SyntheticGenerator::new(state.clone(), SyntheticConfig::default());
        let mut events_rx = state.events_tx.subscribe();

        for _ in 0..50 {
            generator.emit_metrics();
            if let Ok(room_event) = events_rx.try_recv() {
                if let ServerEvent::MetricsUpdated(DashboardMetrics {
                    compliance_score,
                    audit_coverage,
                    ..
                }) = room_event.event
                {
                    assert!((0..=100).contains(&compliance_score));
                    assert!((0..=100).contains(&audit_coverage));
                }
            }
        }
    }
}
