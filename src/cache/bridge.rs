//! Bridge between the real-time channels and the query cache
//!
//! Metrics events carry the full replacement payload and are pushed
//! wholesale; entity-updated events only signal "something changed" and
//! invalidate, leaving the refetch to the cache. Critical findings and
//! completed audits additionally surface as high-visibility notifications,
//! distinct from the connection's Live/Offline indicator.

use tokio::sync::broadcast;
use tracing::{error, info};

use crate::models::{Severity, ServerEvent};
use crate::realtime::{Channel, RealtimeClient, SubscriptionId};

use super::{QueryCache, QueryKey};

/// Capacity of the notification channel
const NOTIFY_BUFFER_SIZE: usize = 64;

/// A transient user-facing notification
#[derive(Debug, Clone)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub severity: Severity,
}

/// Holds the channel subscriptions wiring events into the cache; dropping
/// the bridge detaches them
pub struct DashboardBridge {
    client: RealtimeClient,
    subscriptions: Vec<(Channel, SubscriptionId)>,
    notify_tx: broadcast::Sender<Notification>,
}

impl DashboardBridge {
    /// Wire the event channels into the cache
    pub fn attach(client: &RealtimeClient, cache: QueryCache) -> Self {
        let (notify_tx, _) = broadcast::channel(NOTIFY_BUFFER_SIZE);
        let mut subscriptions = Vec::new();

        // Metrics carry the full new state: replace wholesale
        let metrics_cache = cache.clone();
        subscriptions.push((
            Channel::MetricsUpdated,
            client.subscribe(Channel::MetricsUpdated, move |event| {
                if let ServerEvent::MetricsUpdated(metrics) = event {
                    match serde_json::to_value(metrics) {
                        Ok(value) => {
                            metrics_cache.push_replace(QueryKey::DashboardMetrics, value)
                        }
                        Err(e) => error!(error = %e, "failed to encode metrics push"),
                    }
                }
            }),
        ));

        // Entity updates only say "refetch"
        let activity_cache = cache.clone();
        subscriptions.push((
            Channel::ActivityNew,
            client.subscribe(Channel::ActivityNew, move |_| {
                activity_cache.invalidate(QueryKey::DashboardActivity);
            }),
        ));

        let vuln_cache = cache.clone();
        let vuln_notify = notify_tx.clone();
        subscriptions.push((
            Channel::VulnerabilityUpdated,
            client.subscribe(Channel::VulnerabilityUpdated, move |event| {
                vuln_cache.invalidate(QueryKey::Vulnerabilities);
                // Severity counts feed the summary cards
                vuln_cache.invalidate(QueryKey::DashboardMetrics);

                if let ServerEvent::VulnerabilityUpdated(update) = event {
                    if update.kind == "new"
                        && update.vulnerability.severity == Severity::Critical
                    {
                        info!(
                            vulnerability = %update.vulnerability.title,
                            "critical vulnerability discovered"
                        );
                        let _ = vuln_notify.send(Notification {
                            title: "Critical vulnerability".to_string(),
                            body: update.vulnerability.title.clone(),
                            severity: Severity::Critical,
                        });
                    }
                }
            }),
        ));

        let asset_cache = cache.clone();
        subscriptions.push((
            Channel::AssetUpdated,
            client.subscribe(Channel::AssetUpdated, move |_| {
                asset_cache.invalidate(QueryKey::Assets);
            }),
        ));

        let audit_cache = cache.clone();
        let audit_notify = notify_tx.clone();
        subscriptions.push((
            Channel::AuditUpdated,
            client.subscribe(Channel::AuditUpdated, move |event| {
                audit_cache.invalidate(QueryKey::Audits);

                if let ServerEvent::AuditUpdated(update) = event {
                    if update.kind == "completed" {
                        let _ = audit_notify.send(Notification {
                            title: "Audit completed".to_string(),
                            body: update.audit.title.clone(),
                            severity: Severity::Info,
                        });
                    }
                }
            }),
        ));

        Self {
            client: client.clone(),
            subscriptions,
            notify_tx,
        }
    }

    /// Subscribe to transient high-visibility notifications
    pub fn notifications(&self) -> broadcast::Receiver<Notification> {
        self.notify_tx.subscribe()
    }
}

impl Drop for DashboardBridge {
    fn drop(&mut self) {
        for (channel, id) in self.subscriptions.drain(..) {
            self.client.unsubscribe(channel, id);
        }
    }
}
