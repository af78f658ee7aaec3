//! Seeded mock datasets
//!
//! Static-looking data the fixture serves; collections live in DashMaps so
//! CRUD endpoints can mutate them, but nothing survives a restart.

use chrono::{Duration, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::models::{
    ActivityItem, Asset, Audit, AuditStatus, ComplianceCheck, Report, Severity, User,
    Vulnerability, VulnerabilityStatus,
};

/// Hard-coded credential table; the only authentication the mock knows
pub struct Credential {
    pub username: &'static str,
    pub password: &'static str,
    pub display_name: &'static str,
    pub role: &'static str,
}

pub const CREDENTIALS: &[Credential] = &[
    Credential {
        username: "admin",
        password: "admin123",
        display_name: "Administrator",
        role: "admin",
    },
    Credential {
        username: "auditor",
        password: "audit123",
        display_name: "Lead Auditor",
        role: "auditor",
    },
    Credential {
        username: "viewer",
        password: "view123",
        display_name: "Read-only Viewer",
        role: "viewer",
    },
];

/// In-memory mock collections
#[derive(Default)]
pub struct MockDb {
    pub assets: DashMap<String, Asset>,
    pub audits: DashMap<String, Audit>,
    pub vulnerabilities: DashMap<String, Vulnerability>,
    pub users: DashMap<String, User>,
    pub reports: DashMap<String, Report>,
    pub compliance: DashMap<String, ComplianceCheck>,
    pub activity: Mutex<Vec<ActivityItem>>,
}

impl MockDb {
    pub fn seeded() -> Self {
        let db = Self::default();
        let now = Utc::now();

        for (name, kind, ip, owner, status, risk) in [
            ("web-01", "server", "10.0.1.10", "platform", "online", 62),
            ("web-02", "server", "10.0.1.11", "platform", "online", 35),
            ("db-01", "server", "10.0.2.20", "data", "online", 78),
            ("vpn-gw", "network", "10.0.0.1", "netops", "online", 41),
            ("hr-ws-07", "workstation", "10.0.5.107", "it", "offline", 15),
            ("ci-runner", "service", "10.0.3.30", "platform", "maintenance", 52),
        ] {
            let id = Uuid::new_v4().to_string();
            db.assets.insert(
                id.clone(),
                Asset {
                    id,
                    name: name.to_string(),
                    kind: kind.to_string(),
                    ip_address: ip.to_string(),
                    owner: owner.to_string(),
                    status: status.to_string(),
                    risk_score: risk,
                    last_scanned: Some(now - Duration::days(3)),
                },
            );
        }

        for (title, auditor, status, due_days) in [
            ("Q3 infrastructure audit", "auditor", AuditStatus::InProgress, 14),
            ("PCI-DSS annual review", "auditor", AuditStatus::Planned, 45),
            ("Access control review", "admin", AuditStatus::Completed, -7),
            ("Vendor security assessment", "auditor", AuditStatus::Overdue, -3),
        ] {
            let id = Uuid::new_v4().to_string();
            db.audits.insert(
                id.clone(),
                Audit {
                    id,
                    title: title.to_string(),
                    auditor: auditor.to_string(),
                    status,
                    scope: vec!["web-01".to_string(), "db-01".to_string()],
                    due_date: now + Duration::days(due_days),
                    completed_at: (status == AuditStatus::Completed)
                        .then(|| now - Duration::days(10)),
                },
            );
        }

        for (title, severity, status, cve) in [
            (
                "Outdated TLS configuration",
                Severity::Medium,
                VulnerabilityStatus::Open,
                None,
            ),
            (
                "SQL injection in search endpoint",
                Severity::Critical,
                VulnerabilityStatus::InRemediation,
                Some("CVE-2025-41337"),
            ),
            (
                "Default credentials on admin console",
                Severity::High,
                VulnerabilityStatus::Open,
                None,
            ),
            (
                "Missing rate limiting on login",
                Severity::Low,
                VulnerabilityStatus::Accepted,
                None,
            ),
            (
                "Unpatched kernel on db-01",
                Severity::High,
                VulnerabilityStatus::Open,
                Some("CVE-2025-38921"),
            ),
        ] {
            let id = Uuid::new_v4().to_string();
            let asset_id = db
                .assets
                .iter()
                .next()
                .map(|a| a.key().clone())
                .unwrap_or_default();
            db.vulnerabilities.insert(
                id.clone(),
                Vulnerability {
                    id,
                    title: title.to_string(),
                    description: format!("{} discovered during routine scanning", title),
                    severity,
                    status,
                    asset_id,
                    cve: cve.map(str::to_string),
                    discovered_at: now - Duration::days(5),
                },
            );
        }

        for credential in CREDENTIALS {
            let id = Uuid::new_v4().to_string();
            db.users.insert(
                id.clone(),
                User {
                    id,
                    username: credential.username.to_string(),
                    display_name: credential.display_name.to_string(),
                    role: credential.role.to_string(),
                },
            );
        }

        for (framework, control, description, passed) in [
            ("SOC2", "CC6.1", "Logical access controls restrict access", true),
            ("SOC2", "CC7.2", "Security incidents are monitored", true),
            ("ISO27001", "A.12.6", "Technical vulnerabilities are managed", false),
            ("ISO27001", "A.9.2", "User access is provisioned and reviewed", true),
            ("PCI-DSS", "8.3", "Multi-factor authentication is enforced", false),
        ] {
            let id = Uuid::new_v4().to_string();
            db.compliance.insert(
                id.clone(),
                ComplianceCheck {
                    id,
                    framework: framework.to_string(),
                    control: control.to_string(),
                    description: description.to_string(),
                    passed,
                },
            );
        }

        {
            let id = Uuid::new_v4().to_string();
            db.reports.insert(
                id.clone(),
                Report {
                    id,
                    title: "August executive summary".to_string(),
                    kind: "executive".to_string(),
                    created_at: now - Duration::days(2),
                    created_by: "admin".to_string(),
                    status: "ready".to_string(),
                },
            );
        }

        let mut activity = db.activity.lock();
        activity.push(ActivityItem {
            id: Uuid::new_v4().to_string(),
            kind: "audit".to_string(),
            title: "Audit completed".to_string(),
            description: "Access control review finished".to_string(),
            timestamp: now - Duration::hours(6),
            user: "auditor".to_string(),
            severity: Severity::Info,
        });
        activity.push(ActivityItem {
            id: Uuid::new_v4().to_string(),
            kind: "vulnerability".to_string(),
            title: "Critical finding".to_string(),
            description: "SQL injection in search endpoint".to_string(),
            timestamp: now - Duration::hours(2),
            user: "scanner".to_string(),
            severity: Severity::Critical,
        });
        drop(activity);

        db
    }

    /// Record one activity entry, newest first, bounded
    pub fn push_activity(&self, item: ActivityItem) {
        let mut activity = self.activity.lock();
        activity.insert(0, item);
        activity.truncate(100);
    }
}
