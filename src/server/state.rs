//! Shared mock-server state

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::broadcast;

use crate::models::{
    AuditStatus, DashboardMetrics, Severity, ServerEvent, VulnerabilityStatus,
};

use super::auth::JwtAuth;
use super::mock_data::MockDb;

/// Capacity of the event fan-out channel
pub const EVENT_BUFFER_SIZE: usize = 1024;

/// One event on its way to connected clients, optionally scoped to a room
#[derive(Debug, Clone)]
pub struct RoomEvent {
    /// `None` broadcasts to every connection; `Some(room)` only reaches
    /// connections that joined the room
    pub room: Option<String>,
    pub event: ServerEvent,
}

impl RoomEvent {
    pub fn broadcast(event: ServerEvent) -> Self {
        Self { room: None, event }
    }

    pub fn scoped(room: impl Into<String>, event: ServerEvent) -> Self {
        Self {
            room: Some(room.into()),
            event,
        }
    }
}

/// Shared state for mock-server handlers
#[derive(Clone)]
pub struct MockState {
    pub jwt: JwtAuth,
    pub db: Arc<MockDb>,
    pub events_tx: broadcast::Sender<RoomEvent>,
    pub started_at: Instant,
}

impl MockState {
    pub fn new(jwt_secret: &str) -> Self {
        let (events_tx, _) = broadcast::channel(EVENT_BUFFER_SIZE);
        Self {
            jwt: JwtAuth::new(jwt_secret),
            db: Arc::new(MockDb::seeded()),
            events_tx,
            started_at: Instant::now(),
        }
    }

    /// Emit one event to connected clients; a no-op with no listeners
    pub fn emit(&self, event: RoomEvent) {
        let _ = self.events_tx.send(event);
    }

    /// Compute the dashboard metrics from the current collections
    pub fn metrics(&self) -> DashboardMetrics {
        let db = &self.db;

        let pending = db
            .vulnerabilities
            .iter()
            .filter(|v| {
                matches!(
                    v.status,
                    VulnerabilityStatus::Open | VulnerabilityStatus::InRemediation
                )
            })
            .count() as i64;
        let critical = db
            .vulnerabilities
            .iter()
            .filter(|v| v.severity == Severity::Critical && v.status != VulnerabilityStatus::Resolved)
            .count() as i64;
        let high = db
            .vulnerabilities
            .iter()
            .filter(|v| v.severity == Severity::High && v.status != VulnerabilityStatus::Resolved)
            .count() as i64;
        let overdue = db
            .audits
            .iter()
            .filter(|a| a.status == AuditStatus::Overdue)
            .count() as i64;

        let compliance_total = db.compliance.len() as i64;
        let compliance_passed = db.compliance.iter().filter(|c| c.passed).count() as i64;
        let compliance_score = if compliance_total > 0 {
            compliance_passed * 100 / compliance_total
        } else {
            0
        };

        let total_assets = db.assets.len() as i64;
        let scanned = db
            .assets
            .iter()
            .filter(|a| a.last_scanned.is_some())
            .count() as i64;
        let audit_coverage = if total_assets > 0 {
            scanned * 100 / total_assets
        } else {
            0
        };

        DashboardMetrics {
            total_assets,
            total_audits: db.audits.len() as i64,
            pending_vulnerabilities: pending,
            critical_vulnerabilities: critical,
            high_vulnerabilities: high,
            overdue_tasks: overdue,
            compliance_score,
            audit_coverage,
        }
    }
}
