//! Channel multiplexer
//!
//! Maps the named logical channels onto the single connection. Multiple
//! independent subscribers per channel are allowed; dispatch of one inbound
//! message is synchronous and every registered callback fires exactly once.
//! Unsubscribing is safe from any context, including from inside a callback
//! currently being dispatched on the same channel.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::models::ServerEvent;

/// The logical channels multiplexed over the connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    MetricsUpdated,
    ActivityNew,
    VulnerabilityUpdated,
    AssetUpdated,
    AuditUpdated,
    ScanProgress,
}

impl Channel {
    /// The channel an inbound event belongs to
    pub fn of(event: &ServerEvent) -> Self {
        match event {
            ServerEvent::MetricsUpdated(_) => Channel::MetricsUpdated,
            ServerEvent::ActivityNew(_) => Channel::ActivityNew,
            ServerEvent::VulnerabilityUpdated(_) => Channel::VulnerabilityUpdated,
            ServerEvent::AssetUpdated(_) => Channel::AssetUpdated,
            ServerEvent::AuditUpdated(_) => Channel::AuditUpdated,
            ServerEvent::ScanProgress(_) => Channel::ScanProgress,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::MetricsUpdated => "metrics-updated",
            Channel::ActivityNew => "activity-new",
            Channel::VulnerabilityUpdated => "vulnerability-updated",
            Channel::AssetUpdated => "asset-updated",
            Channel::AuditUpdated => "audit-updated",
            Channel::ScanProgress => "scan-progress",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle returned by `subscribe`, used to unsubscribe exactly that
/// registration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

type Callback = Arc<dyn Fn(&ServerEvent) + Send + Sync>;

#[derive(Default)]
struct Registry {
    subscribers: HashMap<Channel, Vec<(u64, Callback)>>,
}

/// Publish-subscribe bus for inbound events
///
/// Cheap to clone; all clones share one registry.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

#[derive(Default)]
struct BusInner {
    next_id: AtomicU64,
    registry: Mutex<Registry>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback against a channel
    ///
    /// All registered callbacks fire on every event for the channel. No
    /// deduplication: subscribing the same closure twice yields two
    /// independent registrations.
    pub fn subscribe<F>(&self, channel: Channel, callback: F) -> SubscriptionId
    where
        F: Fn(&ServerEvent) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let mut registry = self.inner.registry.lock();
        registry
            .subscribers
            .entry(channel)
            .or_default()
            .push((id, Arc::new(callback)));
        trace!(channel = %channel, id, "subscribed");
        SubscriptionId(id)
    }

    /// Remove exactly one registration; removing a handle that is not
    /// registered is a no-op
    pub fn unsubscribe(&self, channel: Channel, id: SubscriptionId) {
        let mut registry = self.inner.registry.lock();
        if let Some(subs) = registry.subscribers.get_mut(&channel) {
            subs.retain(|(sub_id, _)| *sub_id != id.0);
        }
    }

    /// Number of live registrations on a channel
    pub fn subscriber_count(&self, channel: Channel) -> usize {
        self.inner
            .registry
            .lock()
            .subscribers
            .get(&channel)
            .map_or(0, Vec::len)
    }

    /// Dispatch one inbound event to every subscriber of its channel
    ///
    /// The registry lock is not held while callbacks run, so callbacks may
    /// subscribe or unsubscribe freely. A snapshot of the registrations is
    /// taken up front and each entry is re-checked against the registry
    /// before invocation: a subscriber removed mid-dispatch never fires,
    /// and removals never skip or repeat the remaining subscribers.
    pub fn dispatch(&self, event: &ServerEvent) {
        let channel = Channel::of(event);

        let snapshot: Vec<(u64, Callback)> = {
            let registry = self.inner.registry.lock();
            match registry.subscribers.get(&channel) {
                Some(subs) => subs.clone(),
                None => return,
            }
        };

        for (id, callback) in snapshot {
            let still_registered = {
                let registry = self.inner.registry.lock();
                registry
                    .subscribers
                    .get(&channel)
                    .is_some_and(|subs| subs.iter().any(|(sub_id, _)| *sub_id == id))
            };
            if still_registered {
                callback(event);
            }
        }
    }
}
