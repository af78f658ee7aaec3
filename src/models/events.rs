//! Wire protocol for the real-time channel
//!
//! Inbound events and outbound intents are tagged JSON messages. Payload
//! shapes are validated at this boundary: unknown event names are
//! ignorable, shape mismatches are reported as malformed so the dispatch
//! loop can log and drop them without crashing.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::activity::ActivityItem;
use super::entities::{Audit, Vulnerability};
use super::metrics::DashboardMetrics;

/// Inbound event names recognized by the multiplexer
pub const KNOWN_EVENTS: &[&str] = &[
    "metrics-updated",
    "activity-new",
    "vulnerability-updated",
    "asset-updated",
    "audit-updated",
    "scan-progress",
];

/// Payload of a `vulnerability-updated` event
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VulnerabilityUpdate {
    /// "new" or "updated"
    #[serde(rename = "type")]
    pub kind: String,
    pub vulnerability: Vulnerability,
}

/// Payload of an `asset-updated` event
///
/// Only the asset id is contractually fixed; the rest of the payload is
/// carried opaquely and the event triggers cache invalidation only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetUpdate {
    pub asset_id: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Payload of an `audit-updated` event
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditUpdate {
    /// "completed", "started", "updated", ...
    #[serde(rename = "type")]
    pub kind: String,
    pub audit: Audit,
}

/// Payload of a `scan-progress` event
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanProgressEvent {
    pub asset_id: String,
    pub is_scanning: bool,
    /// 0-100
    pub progress: u8,
    /// Free-text stage label ("port scan", "service enumeration", ...)
    pub stage: String,
    pub findings: u32,
}

/// One inbound event, tagged by channel name
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum ServerEvent {
    MetricsUpdated(DashboardMetrics),
    ActivityNew(ActivityItem),
    VulnerabilityUpdated(VulnerabilityUpdate),
    AssetUpdated(AssetUpdate),
    AuditUpdated(AuditUpdate),
    ScanProgress(ScanProgressEvent),
}

/// Result of decoding one inbound text frame
#[derive(Debug)]
pub enum DecodeOutcome {
    /// A recognized, well-formed event
    Event(ServerEvent),
    /// A message carrying an event name we do not recognize
    UnknownEvent(String),
    /// A recognized event name with a payload that failed validation,
    /// or a frame that is not an event envelope at all
    Malformed(String),
}

impl ServerEvent {
    /// Decode one text frame into an event, distinguishing unknown
    /// channel names (ignorable) from malformed payloads (log and drop).
    pub fn decode(text: &str) -> DecodeOutcome {
        let value: Value = match serde_json::from_str(text) {
            Ok(v) => v,
            Err(e) => return DecodeOutcome::Malformed(format!("not JSON: {}", e)),
        };

        let name = match value.get("event").and_then(Value::as_str) {
            Some(n) => n.to_string(),
            None => return DecodeOutcome::Malformed("missing event name".to_string()),
        };

        if !KNOWN_EVENTS.contains(&name.as_str()) {
            return DecodeOutcome::UnknownEvent(name);
        }

        match serde_json::from_value::<ServerEvent>(value) {
            Ok(event) => DecodeOutcome::Event(event),
            Err(e) => DecodeOutcome::Malformed(format!("{}: {}", name, e)),
        }
    }
}

/// One outbound intent, tagged by type; fire-and-forget
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientIntent {
    JoinRoom {
        room: String,
    },
    LeaveRoom {
        room: String,
    },
    StartScan {
        #[serde(rename = "assetId")]
        asset_id: String,
    },
    Authenticate {
        token: String,
    },
    Ping,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_metrics_updated() {
        let frame = json!({
            "event": "metrics-updated",
            "payload": {
                "totalAssets": 50,
                "totalAudits": 12,
                "pendingVulnerabilities": 7,
                "criticalVulnerabilities": 2,
                "highVulnerabilities": 5,
                "overdueTasks": 3,
                "complianceScore": 87,
                "auditCoverage": 64
            }
        })
        .to_string();

        match ServerEvent::decode(&frame) {
            DecodeOutcome::Event(ServerEvent::MetricsUpdated(m)) => {
                assert_eq!(m.total_assets, 50);
                assert_eq!(m.compliance_score, 87);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_decode_scan_progress() {
        let frame = json!({
            "event": "scan-progress",
            "payload": {
                "assetId": "42",
                "isScanning": true,
                "progress": 30,
                "stage": "scanning",
                "findings": 1
            }
        })
        .to_string();

        match ServerEvent::decode(&frame) {
            DecodeOutcome::Event(ServerEvent::ScanProgress(p)) => {
                assert_eq!(p.asset_id, "42");
                assert!(p.is_scanning);
                assert_eq!(p.progress, 30);
                assert_eq!(p.findings, 1);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_decode_asset_updated_keeps_extra_fields() {
        let frame = json!({
            "event": "asset-updated",
            "payload": {
                "assetId": "web-01",
                "status": "online",
                "riskScore": 40
            }
        })
        .to_string();

        match ServerEvent::decode(&frame) {
            DecodeOutcome::Event(ServerEvent::AssetUpdated(u)) => {
                assert_eq!(u.asset_id, "web-01");
                assert_eq!(u.extra["status"], "online");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_decode_unknown_event_is_ignorable() {
        let frame = json!({ "event": "totally-new-thing", "payload": {} }).to_string();

        match ServerEvent::decode(&frame) {
            DecodeOutcome::UnknownEvent(name) => assert_eq!(name, "totally-new-thing"),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_decode_malformed_payload_is_dropped() {
        let frame = json!({
            "event": "scan-progress",
            "payload": { "assetId": 42 }
        })
        .to_string();

        assert!(matches!(
            ServerEvent::decode(&frame),
            DecodeOutcome::Malformed(_)
        ));
    }

    #[test]
    fn test_decode_non_json_frame() {
        assert!(matches!(
            ServerEvent::decode("not json at all"),
            DecodeOutcome::Malformed(_)
        ));
    }

    #[test]
    fn test_intent_wire_format() {
        let intent = ClientIntent::JoinRoom {
            room: "asset:42".to_string(),
        };
        let json = serde_json::to_value(&intent).unwrap();
        assert_eq!(json["type"], "join_room");
        assert_eq!(json["room"], "asset:42");

        let scan = ClientIntent::StartScan {
            asset_id: "42".to_string(),
        };
        let json = serde_json::to_value(&scan).unwrap();
        assert_eq!(json["type"], "start_scan");
        assert_eq!(json["assetId"], "42");

        let ping = serde_json::to_value(&ClientIntent::Ping).unwrap();
        assert_eq!(ping["type"], "ping");
    }

    #[test]
    fn test_event_roundtrip_matches_channel_name() {
        let event = ServerEvent::ActivityNew(ActivityItem {
            id: "a1".to_string(),
            kind: "scan".to_string(),
            title: "Scan started".to_string(),
            description: "Full scan of web-01".to_string(),
            timestamp: chrono::Utc::now(),
            user: "admin".to_string(),
            severity: crate::models::Severity::Info,
        });

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "activity-new");
    }
}
