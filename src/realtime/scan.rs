//! Per-asset scan progress state machine
//!
//! Driven by `scan-progress` events from the asset's room. Starting a scan
//! is a two-phase optimistic transition: `Requested` is applied locally
//! before any server acknowledgment and is overwritten wholesale by the
//! first real progress event (`Scanning`). Progress is monotonically
//! non-decreasing within one session; a session closes exactly when
//! progress reaches 100 or the scan is explicitly stopped.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::models::{ClientIntent, ScanProgressEvent, ServerEvent};

use super::channels::{Channel, SubscriptionId};
use super::connection::RealtimeClient;
use super::rooms::asset_room;

/// Scan lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanPhase {
    /// No scan running
    #[default]
    Idle,
    /// Start intent sent, tentative local state, no server event yet
    Requested,
    /// Confirmed by at least one server progress event
    Scanning,
    /// Progress reached 100; terminal for the session
    Complete,
}

/// Full progress record for one asset
///
/// Overwritten wholesale by each accepted event; stage and findings are as
/// reported, never accumulated locally.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScanState {
    pub phase: ScanPhase,
    /// 0-100
    pub progress: u8,
    pub stage: String,
    pub findings: u32,
    /// Bumped on every new session (explicit start or implicit first
    /// event), so the terminal transition is observable exactly once per
    /// session
    pub session: u64,
}

impl ScanState {
    pub fn is_scanning(&self) -> bool {
        matches!(self.phase, ScanPhase::Requested | ScanPhase::Scanning)
    }
}

/// Tracks one asset's scan progress over the room-scoped channel
///
/// Joins `asset:<id>` on creation and leaves it on drop; the subscription
/// is removed on drop as well.
pub struct ScanMonitor {
    client: RealtimeClient,
    asset_id: String,
    state_tx: Arc<watch::Sender<ScanState>>,
    subscription: SubscriptionId,
}

impl ScanMonitor {
    pub fn new(client: &RealtimeClient, asset_id: &str) -> Self {
        let (state_tx, _) = watch::channel(ScanState::default());
        let state_tx = Arc::new(state_tx);

        client.join_room(&asset_room(asset_id));

        let tx = state_tx.clone();
        let id = asset_id.to_string();
        let subscription = client.subscribe(Channel::ScanProgress, move |event| {
            if let ServerEvent::ScanProgress(progress) = event {
                if progress.asset_id == id {
                    apply_progress(&tx, progress);
                }
            }
        });

        Self {
            client: client.clone(),
            asset_id: asset_id.to_string(),
            state_tx,
            subscription,
        }
    }

    /// Send the scan-start intent and optimistically enter `Requested`
    /// with progress reset to zero. The first server event reconciles the
    /// tentative state.
    pub fn start(&self) {
        self.state_tx.send_modify(|state| {
            state.session += 1;
            state.phase = ScanPhase::Requested;
            state.progress = 0;
            state.stage.clear();
            state.findings = 0;
        });
        self.client.send_intent(ClientIntent::StartScan {
            asset_id: self.asset_id.clone(),
        });
    }

    /// Explicitly stop the session: local transition back to `Idle`.
    /// Fire-and-forget; nothing is awaited.
    pub fn stop(&self) {
        self.state_tx.send_if_modified(|state| {
            if state.is_scanning() {
                state.phase = ScanPhase::Idle;
                true
            } else {
                false
            }
        });
    }

    /// Current progress record
    pub fn state(&self) -> ScanState {
        self.state_tx.borrow().clone()
    }

    /// Observe progress changes; the `Complete` phase appears exactly
    /// once per session
    pub fn watch(&self) -> watch::Receiver<ScanState> {
        self.state_tx.subscribe()
    }

    pub fn asset_id(&self) -> &str {
        &self.asset_id
    }
}

impl Drop for ScanMonitor {
    fn drop(&mut self) {
        self.client
            .unsubscribe(Channel::ScanProgress, self.subscription);
        self.client.leave_room(&asset_room(&self.asset_id));
    }
}

/// Fold one server event into the progress record
fn apply_progress(state_tx: &watch::Sender<ScanState>, event: &ScanProgressEvent) {
    state_tx.send_if_modified(|state| {
        match state.phase {
            // First event for an unrequested scan: the record is created
            // implicitly, opening a new session. Events for a scan that is
            // not running (duplicate terminals included) are dropped.
            ScanPhase::Idle | ScanPhase::Complete => {
                if !event.is_scanning {
                    return false;
                }
                state.session += 1;
            }
            // Reconciles the optimistic state; accepted regardless of
            // progress value
            ScanPhase::Requested => {}
            ScanPhase::Scanning => {
                // Progress never decreases within a session
                if event.progress < state.progress {
                    warn!(
                        asset_id = %event.asset_id,
                        current = state.progress,
                        received = event.progress,
                        "dropping regressive scan progress"
                    );
                    return false;
                }
            }
        }

        state.progress = event.progress.min(100);
        state.stage = event.stage.clone();
        state.findings = event.findings;
        state.phase = if event.progress >= 100 {
            debug!(asset_id = %event.asset_id, "scan complete");
            ScanPhase::Complete
        } else if event.is_scanning {
            ScanPhase::Scanning
        } else {
            // Stopped remotely before completion
            ScanPhase::Idle
        };
        true
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RealtimeConfig, ReconnectConfig};
    use std::time::Duration;

    fn offline_client() -> RealtimeClient {
        let config = RealtimeConfig {
            ws_url: url::Url::parse("ws://127.0.0.1:1/ws").unwrap(),
            reconnect: ReconnectConfig {
                base_delay: Duration::from_millis(10),
                max_attempts: 1,
            },
        };
        RealtimeClient::new(config, Arc::new(|| None))
    }

    fn progress(asset_id: &str, progress: u8, stage: &str, scanning: bool, findings: u32) -> ServerEvent {
        ServerEvent::ScanProgress(ScanProgressEvent {
            asset_id: asset_id.to_string(),
            is_scanning: scanning,
            progress,
            stage: stage.to_string(),
            findings,
        })
    }

    #[tokio::test]
    async fn test_full_scan_session() {
        let client = offline_client();
        let monitor = ScanMonitor::new(&client, "42");

        monitor.start();
        let state = monitor.state();
        assert_eq!(state.phase, ScanPhase::Requested);
        assert_eq!(state.progress, 0);

        client
            .bus()
            .dispatch(&progress("42", 30, "scanning", true, 1));
        let state = monitor.state();
        assert_eq!(state.phase, ScanPhase::Scanning);
        assert_eq!(state.progress, 30);
        assert_eq!(state.stage, "scanning");
        assert_eq!(state.findings, 1);
        assert!(state.is_scanning());

        client.bus().dispatch(&progress("42", 100, "done", false, 4));
        let state = monitor.state();
        assert_eq!(state.phase, ScanPhase::Complete);
        assert_eq!(state.progress, 100);
        assert_eq!(state.stage, "done");
        assert_eq!(state.findings, 4);
        assert!(!state.is_scanning());
    }

    #[tokio::test]
    async fn test_events_for_other_assets_are_ignored() {
        let client = offline_client();
        let monitor = ScanMonitor::new(&client, "42");

        monitor.start();
        client
            .bus()
            .dispatch(&progress("99", 50, "scanning", true, 2));

        let state = monitor.state();
        assert_eq!(state.phase, ScanPhase::Requested);
        assert_eq!(state.progress, 0);
    }

    #[tokio::test]
    async fn test_progress_is_monotonic_within_a_session() {
        let client = offline_client();
        let monitor = ScanMonitor::new(&client, "42");

        monitor.start();
        client
            .bus()
            .dispatch(&progress("42", 60, "enumeration", true, 2));
        // Regression: dropped, record unchanged
        client
            .bus()
            .dispatch(&progress("42", 40, "port scan", true, 9));

        let state = monitor.state();
        assert_eq!(state.progress, 60);
        assert_eq!(state.stage, "enumeration");
        assert_eq!(state.findings, 2);
    }

    #[tokio::test]
    async fn test_new_start_resets_progress() {
        let client = offline_client();
        let monitor = ScanMonitor::new(&client, "42");

        monitor.start();
        client.bus().dispatch(&progress("42", 100, "done", false, 3));
        assert_eq!(monitor.state().phase, ScanPhase::Complete);
        let first_session = monitor.state().session;

        // Only an explicit new start may move progress downward
        monitor.start();
        let state = monitor.state();
        assert_eq!(state.phase, ScanPhase::Requested);
        assert_eq!(state.progress, 0);
        assert_eq!(state.findings, 0);
        assert!(state.session > first_session);
    }

    #[tokio::test]
    async fn test_explicit_stop_returns_to_idle() {
        let client = offline_client();
        let monitor = ScanMonitor::new(&client, "42");

        monitor.start();
        client
            .bus()
            .dispatch(&progress("42", 50, "scanning", true, 0));
        monitor.stop();

        let state = monitor.state();
        assert_eq!(state.phase, ScanPhase::Idle);
        assert!(!state.is_scanning());

        // Stop when already idle changes nothing
        monitor.stop();
        assert_eq!(monitor.state().phase, ScanPhase::Idle);
    }

    #[tokio::test]
    async fn test_record_created_implicitly_on_first_event() {
        let client = offline_client();
        let monitor = ScanMonitor::new(&client, "42");

        // No local start: a scan kicked off elsewhere still gets tracked
        client
            .bus()
            .dispatch(&progress("42", 20, "port scan", true, 0));

        let state = monitor.state();
        assert_eq!(state.phase, ScanPhase::Scanning);
        assert_eq!(state.progress, 20);
        assert_eq!(state.session, 1);
    }

    #[tokio::test]
    async fn test_terminal_transition_observable_exactly_once_per_session() {
        let client = offline_client();
        let monitor = ScanMonitor::new(&client, "42");

        monitor.start();
        client
            .bus()
            .dispatch(&progress("42", 30, "scanning", true, 1));
        client.bus().dispatch(&progress("42", 100, "done", false, 4));
        assert_eq!(monitor.state().phase, ScanPhase::Complete);

        // A duplicate terminal event publishes no further state change:
        // the terminal transition stays observable exactly once
        let mut rx = monitor.watch();
        rx.mark_unchanged();
        client.bus().dispatch(&progress("42", 100, "done", false, 4));
        assert!(!rx.has_changed().unwrap());
        assert_eq!(monitor.state().session, 1);
    }

    #[tokio::test]
    async fn test_requested_state_always_overwritten_by_first_event() {
        let client = offline_client();
        let monitor = ScanMonitor::new(&client, "42");

        monitor.start();
        assert_eq!(monitor.state().phase, ScanPhase::Requested);

        // Even a 0% event reconciles the tentative state
        client
            .bus()
            .dispatch(&progress("42", 0, "starting", true, 0));
        assert_eq!(monitor.state().phase, ScanPhase::Scanning);
        assert_eq!(monitor.state().stage, "starting");
    }
}
