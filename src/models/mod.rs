//! Data model and wire protocol types

pub mod activity;
pub mod entities;
pub mod events;
pub mod metrics;

pub use activity::ActivityItem;
pub use entities::{
    Asset, Audit, AuditStatus, ComplianceCheck, Report, Severity, User, Vulnerability,
    VulnerabilityStatus,
};
pub use events::{ClientIntent, DecodeOutcome, ScanProgressEvent, ServerEvent};
pub use metrics::{ChartData, ChartSeries, DashboardMetrics};
