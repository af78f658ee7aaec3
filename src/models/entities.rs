//! Entity types served by the REST endpoints
//!
//! These shapes back the asset, audit, vulnerability, compliance, user and
//! report views; the mock server seeds them from static data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity scale shared by vulnerabilities and activity entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

/// A tracked asset (host, service, application)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: String,
    pub name: String,
    /// Asset class: "server", "workstation", "service", "network"
    #[serde(rename = "type")]
    pub kind: String,
    pub ip_address: String,
    pub owner: String,
    /// Operational status: "online", "offline", "maintenance"
    pub status: String,
    pub risk_score: i64,
    pub last_scanned: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    Planned,
    InProgress,
    Completed,
    Overdue,
}

/// A security audit engagement
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Audit {
    pub id: String,
    pub title: String,
    pub auditor: String,
    pub status: AuditStatus,
    pub scope: Vec<String>,
    pub due_date: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VulnerabilityStatus {
    Open,
    InRemediation,
    Resolved,
    Accepted,
}

/// A discovered vulnerability
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vulnerability {
    pub id: String,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub status: VulnerabilityStatus,
    pub asset_id: String,
    pub cve: Option<String>,
    pub discovered_at: DateTime<Utc>,
}

/// One item of a compliance checklist
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceCheck {
    pub id: String,
    /// Framework the check belongs to: "SOC2", "ISO27001", ...
    pub framework: String,
    pub control: String,
    pub description: String,
    pub passed: bool,
}

/// Dashboard user from the hard-coded credential table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub display_name: String,
    /// Role: "admin", "auditor", "viewer"
    pub role: String,
}

/// Report metadata
///
/// Report generation is a stub: the endpoint returns canned metadata and
/// never renders a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: String,
    pub title: String,
    /// Report kind: "executive", "technical", "compliance"
    #[serde(rename = "type")]
    pub kind: String,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    /// Always "ready" in the mock; a real generator would track progress
    pub status: String,
}
