//! Mock REST handlers
//!
//! Thin CRUD over the seeded collections plus the dashboard read
//! endpoints. Mutations emit the matching entity-updated event so
//! connected clients invalidate their caches.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::VigilError;
use crate::models::events::{AssetUpdate, AuditUpdate, VulnerabilityUpdate};
use crate::models::{
    ActivityItem, Asset, Audit, AuditStatus, ChartData, ChartSeries, Report, ServerEvent,
    Severity, User, Vulnerability, VulnerabilityStatus,
};

use super::auth::AuthenticatedUser;
use super::mock_data::CREDENTIALS;
use super::state::{MockState, RoomEvent};

/// Health check
pub async fn health_check(State(state): State<MockState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime": state.started_at.elapsed().as_secs(),
    }))
}

// Auth

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Handle login against the hard-coded credential table
pub async fn login(
    State(state): State<MockState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, VigilError> {
    let credential = CREDENTIALS
        .iter()
        .find(|c| c.username == req.username && c.password == req.password)
        .ok_or_else(|| {
            warn!(username = %req.username, "login failed");
            VigilError::InvalidCredentials
        })?;

    let token = state.jwt.generate_token(credential.username, 24)?;
    let user = state
        .db
        .users
        .iter()
        .find(|u| u.username == credential.username)
        .map(|u| u.clone())
        .ok_or_else(|| VigilError::Internal("credential without user record".to_string()))?;

    info!(username = %credential.username, "user logged in");

    Ok(Json(json!({ "token": token, "user": user })))
}

// Dashboard

pub async fn dashboard_metrics(
    State(state): State<MockState>,
    _user: AuthenticatedUser,
) -> impl IntoResponse {
    Json(state.metrics())
}

pub async fn dashboard_activity(
    State(state): State<MockState>,
    _user: AuthenticatedUser,
) -> impl IntoResponse {
    let activity: Vec<ActivityItem> = state.db.activity.lock().clone();
    Json(activity)
}

/// Synthetic chart data: vulnerabilities by severity over the last week
pub async fn dashboard_charts(
    State(state): State<MockState>,
    _user: AuthenticatedUser,
) -> impl IntoResponse {
    let labels: Vec<String> = (0..7)
        .rev()
        .map(|d| (Utc::now() - chrono::Duration::days(d)).format("%m-%d").to_string())
        .collect();

    let base = state.db.vulnerabilities.len() as i64;
    let series = vec![
        ChartSeries {
            label: "critical".to_string(),
            data: (0..7).map(|i| (base + i) % 4).collect(),
        },
        ChartSeries {
            label: "high".to_string(),
            data: (0..7).map(|i| (base + i * 2) % 7).collect(),
        },
        ChartSeries {
            label: "resolved".to_string(),
            data: (0..7).map(|i| (i * 3) % 9).collect(),
        },
    ];

    Json(ChartData {
        labels,
        series,
        generated_at: Utc::now(),
    })
}

// Assets

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub ip_address: String,
    pub owner: String,
}

pub async fn list_assets(
    State(state): State<MockState>,
    _user: AuthenticatedUser,
) -> impl IntoResponse {
    let mut assets: Vec<Asset> = state.db.assets.iter().map(|a| a.clone()).collect();
    assets.sort_by(|a, b| a.name.cmp(&b.name));
    Json(assets)
}

pub async fn get_asset(
    State(state): State<MockState>,
    _user: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, VigilError> {
    state
        .db
        .assets
        .get(&id)
        .map(|a| Json(a.clone()))
        .ok_or_else(|| VigilError::NotFound(format!("asset {}", id)))
}

pub async fn create_asset(
    State(state): State<MockState>,
    user: AuthenticatedUser,
    Json(req): Json<AssetRequest>,
) -> Result<impl IntoResponse, VigilError> {
    if req.name.is_empty() {
        return Err(VigilError::InvalidRequest("name is required".to_string()));
    }

    let asset = Asset {
        id: Uuid::new_v4().to_string(),
        name: req.name,
        kind: req.kind,
        ip_address: req.ip_address,
        owner: req.owner,
        status: "online".to_string(),
        risk_score: 0,
        last_scanned: None,
    };
    state.db.assets.insert(asset.id.clone(), asset.clone());

    info!(id = %asset.id, name = %asset.name, user = %user.username, "created asset");
    emit_asset_updated(&state, &asset.id);

    Ok((StatusCode::CREATED, Json(asset)))
}

pub async fn update_asset(
    State(state): State<MockState>,
    _user: AuthenticatedUser,
    Path(id): Path<String>,
    Json(req): Json<AssetRequest>,
) -> Result<impl IntoResponse, VigilError> {
    let mut asset = state
        .db
        .assets
        .get_mut(&id)
        .ok_or_else(|| VigilError::NotFound(format!("asset {}", id)))?;

    asset.name = req.name;
    asset.kind = req.kind;
    asset.ip_address = req.ip_address;
    asset.owner = req.owner;
    let updated = asset.clone();
    drop(asset);

    emit_asset_updated(&state, &id);
    Ok(Json(updated))
}

pub async fn delete_asset(
    State(state): State<MockState>,
    _user: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, VigilError> {
    state
        .db
        .assets
        .remove(&id)
        .ok_or_else(|| VigilError::NotFound(format!("asset {}", id)))?;

    info!(%id, "deleted asset");
    emit_asset_updated(&state, &id);
    Ok(StatusCode::NO_CONTENT)
}

fn emit_asset_updated(state: &MockState, asset_id: &str) {
    state.emit(RoomEvent::broadcast(ServerEvent::AssetUpdated(
        AssetUpdate {
            asset_id: asset_id.to_string(),
            extra: serde_json::Map::new(),
        },
    )));
}

// Audits

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRequest {
    pub title: String,
    pub auditor: String,
    #[serde(default)]
    pub scope: Vec<String>,
    pub due_date: chrono::DateTime<Utc>,
}

pub async fn list_audits(
    State(state): State<MockState>,
    _user: AuthenticatedUser,
) -> impl IntoResponse {
    let mut audits: Vec<Audit> = state.db.audits.iter().map(|a| a.clone()).collect();
    audits.sort_by(|a, b| a.due_date.cmp(&b.due_date));
    Json(audits)
}

pub async fn create_audit(
    State(state): State<MockState>,
    _user: AuthenticatedUser,
    Json(req): Json<AuditRequest>,
) -> Result<impl IntoResponse, VigilError> {
    if req.title.is_empty() {
        return Err(VigilError::InvalidRequest("title is required".to_string()));
    }

    let audit = Audit {
        id: Uuid::new_v4().to_string(),
        title: req.title,
        auditor: req.auditor,
        status: AuditStatus::Planned,
        scope: req.scope,
        due_date: req.due_date,
        completed_at: None,
    };
    state.db.audits.insert(audit.id.clone(), audit.clone());

    state.emit(RoomEvent::broadcast(ServerEvent::AuditUpdated(
        AuditUpdate {
            kind: "created".to_string(),
            audit: audit.clone(),
        },
    )));

    Ok((StatusCode::CREATED, Json(audit)))
}

/// Mark an audit completed; emits the completion event clients surface as
/// a notification
pub async fn complete_audit(
    State(state): State<MockState>,
    _user: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, VigilError> {
    let mut audit = state
        .db
        .audits
        .get_mut(&id)
        .ok_or_else(|| VigilError::NotFound(format!("audit {}", id)))?;

    audit.status = AuditStatus::Completed;
    audit.completed_at = Some(Utc::now());
    let completed = audit.clone();
    drop(audit);

    state.emit(RoomEvent::broadcast(ServerEvent::AuditUpdated(
        AuditUpdate {
            kind: "completed".to_string(),
            audit: completed.clone(),
        },
    )));

    Ok(Json(completed))
}

// Vulnerabilities

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VulnerabilityRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub severity: Severity,
    pub asset_id: String,
    pub cve: Option<String>,
}

pub async fn list_vulnerabilities(
    State(state): State<MockState>,
    _user: AuthenticatedUser,
) -> impl IntoResponse {
    let mut vulns: Vec<Vulnerability> =
        state.db.vulnerabilities.iter().map(|v| v.clone()).collect();
    vulns.sort_by(|a, b| b.severity.cmp(&a.severity));
    Json(vulns)
}

pub async fn create_vulnerability(
    State(state): State<MockState>,
    _user: AuthenticatedUser,
    Json(req): Json<VulnerabilityRequest>,
) -> Result<impl IntoResponse, VigilError> {
    let vulnerability = Vulnerability {
        id: Uuid::new_v4().to_string(),
        title: req.title,
        description: req.description,
        severity: req.severity,
        status: VulnerabilityStatus::Open,
        asset_id: req.asset_id,
        cve: req.cve,
        discovered_at: Utc::now(),
    };
    state
        .db
        .vulnerabilities
        .insert(vulnerability.id.clone(), vulnerability.clone());

    state.emit(RoomEvent::broadcast(ServerEvent::VulnerabilityUpdated(
        VulnerabilityUpdate {
            kind: "new".to_string(),
            vulnerability: vulnerability.clone(),
        },
    )));

    Ok((StatusCode::CREATED, Json(vulnerability)))
}

// Users

pub async fn list_users(
    State(state): State<MockState>,
    _user: AuthenticatedUser,
) -> impl IntoResponse {
    let users: Vec<User> = state.db.users.iter().map(|u| u.clone()).collect();
    Json(users)
}

// Reports

pub async fn list_reports(
    State(state): State<MockState>,
    _user: AuthenticatedUser,
) -> impl IntoResponse {
    let reports: Vec<Report> = state.db.reports.iter().map(|r| r.clone()).collect();
    Json(reports)
}

#[derive(Debug, Deserialize)]
pub struct GenerateReportRequest {
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Report generation stub: returns canned metadata immediately, renders
/// nothing
pub async fn generate_report(
    State(state): State<MockState>,
    user: AuthenticatedUser,
    Json(req): Json<GenerateReportRequest>,
) -> Result<impl IntoResponse, VigilError> {
    let report = Report {
        id: Uuid::new_v4().to_string(),
        title: req.title,
        kind: req.kind,
        created_at: Utc::now(),
        created_by: user.username,
        status: "ready".to_string(),
    };
    state.db.reports.insert(report.id.clone(), report.clone());

    Ok((StatusCode::CREATED, Json(report)))
}
