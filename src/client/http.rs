//! REST client
//!
//! The polling side of the dashboard: thin typed wrappers over the REST
//! endpoints, with the bearer token attached from the session store. A 401
//! on any authenticated call forces a logout; every other failure is
//! transient and surfaced to the caller as an error.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::cache::{FnFetcher, QueryCache, QueryKey};
use crate::config::ApiClientConfig;
use crate::error::{Result, VigilError};
use crate::models::{
    ActivityItem, Asset, Audit, ChartData, DashboardMetrics, Report, Severity, User,
    Vulnerability,
};

use super::session::SessionStore;

/// Login request body for `POST /auth/login`
#[derive(Debug, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Login response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAssetRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub ip_address: String,
    pub owner: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAuditRequest {
    pub title: String,
    pub auditor: String,
    pub scope: Vec<String>,
    pub due_date: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVulnerabilityRequest {
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub asset_id: String,
    pub cve: Option<String>,
}

/// Report generation request; the endpoint is a stub that returns canned
/// metadata
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateReportRequest {
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// REST API client; cheap to clone
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    session: SessionStore,
}

impl ApiClient {
    pub fn new(config: &ApiClientConfig, session: SessionStore) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            session,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| VigilError::InvalidConfig("API base URL cannot be a base".into()))?;
            segments.pop_if_empty();
            for part in path.split('/').filter(|p| !p.is_empty()) {
                segments.push(part);
            }
        }
        Ok(url)
    }

    fn authed(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.http.request(method, url);
        match self.session.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send an authenticated request; a 401 response is fatal to the
    /// session
    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder, path: &str) -> Result<T> {
        let response = builder.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            warn!(%path, "authentication rejected; forcing logout");
            self.session.force_logout();
            return Err(VigilError::SessionExpired);
        }
        if !status.is_success() {
            return Err(VigilError::UnexpectedStatus {
                status: status.as_u16(),
                endpoint: path.to_string(),
            });
        }

        Ok(response.json().await?)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.endpoint(path)?;
        debug!(%url, "GET");
        self.send(self.authed(Method::GET, url), path).await
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.endpoint(path)?;
        self.send(self.authed(Method::POST, url).json(body), path)
            .await
    }

    async fn put_json<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.endpoint(path)?;
        self.send(self.authed(Method::PUT, url).json(body), path)
            .await
    }

    async fn delete_path(&self, path: &str) -> Result<()> {
        let url = self.endpoint(path)?;
        let response = self.authed(Method::DELETE, url).send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            self.session.force_logout();
            return Err(VigilError::SessionExpired);
        }
        if !status.is_success() {
            return Err(VigilError::UnexpectedStatus {
                status: status.as_u16(),
                endpoint: path.to_string(),
            });
        }
        Ok(())
    }

    /// Authenticate and persist the issued token.
    ///
    /// A 401 here means bad credentials, not an expired session; the
    /// stored session is left untouched.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse> {
        let url = self.endpoint("auth/login")?;
        let response = self
            .http
            .post(url)
            .json(&LoginRequest {
                username: username.to_string(),
                password: password.to_string(),
            })
            .send()
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(VigilError::InvalidCredentials);
        }
        if !response.status().is_success() {
            return Err(VigilError::UnexpectedStatus {
                status: response.status().as_u16(),
                endpoint: "auth/login".to_string(),
            });
        }

        let login: LoginResponse = response.json().await?;
        self.session.store(&login.token)?;
        Ok(login)
    }

    // Dashboard

    pub async fn dashboard_metrics(&self) -> Result<DashboardMetrics> {
        self.get_json("dashboard/metrics").await
    }

    pub async fn dashboard_activity(&self) -> Result<Vec<ActivityItem>> {
        self.get_json("dashboard/activity").await
    }

    pub async fn dashboard_charts(&self) -> Result<ChartData> {
        self.get_json("dashboard/charts").await
    }

    // Assets

    pub async fn list_assets(&self) -> Result<Vec<Asset>> {
        self.get_json("assets").await
    }

    pub async fn get_asset(&self, id: &str) -> Result<Asset> {
        self.get_json(&format!("assets/{}", id)).await
    }

    pub async fn create_asset(&self, req: &CreateAssetRequest) -> Result<Asset> {
        self.post_json("assets", req).await
    }

    pub async fn update_asset(&self, id: &str, req: &CreateAssetRequest) -> Result<Asset> {
        self.put_json(&format!("assets/{}", id), req).await
    }

    pub async fn delete_asset(&self, id: &str) -> Result<()> {
        self.delete_path(&format!("assets/{}", id)).await
    }

    // Audits

    pub async fn list_audits(&self) -> Result<Vec<Audit>> {
        self.get_json("audits").await
    }

    pub async fn create_audit(&self, req: &CreateAuditRequest) -> Result<Audit> {
        self.post_json("audits", req).await
    }

    // Vulnerabilities

    pub async fn list_vulnerabilities(&self) -> Result<Vec<Vulnerability>> {
        self.get_json("vulnerabilities").await
    }

    pub async fn create_vulnerability(
        &self,
        req: &CreateVulnerabilityRequest,
    ) -> Result<Vulnerability> {
        self.post_json("vulnerabilities", req).await
    }

    // Users

    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.get_json("users").await
    }

    // Reports

    pub async fn list_reports(&self) -> Result<Vec<Report>> {
        self.get_json("reports").await
    }

    pub async fn generate_report(&self, req: &GenerateReportRequest) -> Result<Report> {
        self.post_json("reports/generate", req).await
    }

    /// Register this client as the refetch path for every cached query
    pub fn register_fetchers(&self, cache: &QueryCache) {
        let fetch = |client: ApiClient, path: &'static str| {
            Arc::new(FnFetcher(move || {
                let client = client.clone();
                async move { client.get_json::<Value>(path).await }
            }))
        };

        cache.register(
            QueryKey::DashboardMetrics,
            fetch(self.clone(), "dashboard/metrics"),
        );
        cache.register(
            QueryKey::DashboardActivity,
            fetch(self.clone(), "dashboard/activity"),
        );
        cache.register(
            QueryKey::DashboardCharts,
            fetch(self.clone(), "dashboard/charts"),
        );
        cache.register(QueryKey::Assets, fetch(self.clone(), "assets"));
        cache.register(QueryKey::Audits, fetch(self.clone(), "audits"));
        cache.register(
            QueryKey::Vulnerabilities,
            fetch(self.clone(), "vulnerabilities"),
        );
        cache.register(QueryKey::Users, fetch(self.clone(), "users"));
        cache.register(QueryKey::Reports, fetch(self.clone(), "reports"));
    }
}
