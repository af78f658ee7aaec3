//! REST client and session handling

pub mod http;
pub mod session;

pub use http::{
    ApiClient, CreateAssetRequest, CreateAuditRequest, CreateVulnerabilityRequest,
    GenerateReportRequest, LoginRequest, LoginResponse,
};
pub use session::{SessionState, SessionStore};
