use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entities::Severity;

/// One entry in the dashboard activity feed
///
/// Delivered over the `activity-new` channel and by `GET /dashboard/activity`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityItem {
    pub id: String,
    /// Activity kind: "scan", "audit", "vulnerability", "login", ...
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    /// Display name of the user who caused the activity
    pub user: String,
    pub severity: Severity,
}
