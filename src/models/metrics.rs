use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Dashboard summary metrics
///
/// Pushed wholesale over the `metrics-updated` channel and served by
/// `GET /dashboard/metrics`; field names are camelCase on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    /// Total number of tracked assets
    pub total_assets: i64,
    /// Total number of audits
    pub total_audits: i64,
    /// Vulnerabilities awaiting triage or remediation
    pub pending_vulnerabilities: i64,
    /// Open critical-severity vulnerabilities
    pub critical_vulnerabilities: i64,
    /// Open high-severity vulnerabilities
    pub high_vulnerabilities: i64,
    /// Audit tasks past their due date
    pub overdue_tasks: i64,
    /// Overall compliance score (0-100)
    pub compliance_score: i64,
    /// Share of assets covered by at least one audit (0-100)
    pub audit_coverage: i64,
}

/// One named series of chart points
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSeries {
    pub label: String,
    pub data: Vec<i64>,
}

/// Chart data served by `GET /dashboard/charts`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartData {
    /// Category labels shared by all series
    pub labels: Vec<String>,
    pub series: Vec<ChartSeries>,
    pub generated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_wire_field_names_are_camel_case() {
        let metrics = DashboardMetrics {
            total_assets: 50,
            total_audits: 12,
            pending_vulnerabilities: 7,
            critical_vulnerabilities: 2,
            high_vulnerabilities: 5,
            overdue_tasks: 3,
            compliance_score: 87,
            audit_coverage: 64,
        };

        let json = serde_json::to_value(&metrics).unwrap();
        assert_eq!(json["totalAssets"], 50);
        assert_eq!(json["pendingVulnerabilities"], 7);
        assert_eq!(json["complianceScore"], 87);
        assert_eq!(json["auditCoverage"], 64);
    }
}
