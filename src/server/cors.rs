//! CORS layer for the mock server
//!
//! The local development hosts the dashboard runs on are always allowed;
//! `CORS_ORIGINS` extends the whitelist for anything else.

use axum::http::header;
use axum::http::{HeaderValue, Method};
use tower_http::cors::CorsLayer;
use tracing::warn;

/// Origins the dashboard dev server uses out of the box
const LOCAL_ORIGINS: [&str; 2] = ["http://localhost:3000", "http://127.0.0.1:3000"];

/// Build the CORS layer: local development origins plus the configured
/// whitelist
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let mut origins: Vec<HeaderValue> = LOCAL_ORIGINS
        .iter()
        .map(|o| HeaderValue::from_static(o))
        .collect();
    for origin in allowed_origins {
        match origin.parse() {
            Ok(value) => origins.push(value),
            Err(_) => warn!(%origin, "skipping unparseable CORS origin"),
        }
    }

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use tower::ServiceExt;

    use crate::config::MockServerConfig;
    use crate::server::MockServer;

    fn server(cors_origins: Vec<String>) -> MockServer {
        MockServer::new(MockServerConfig {
            port: 0,
            host: "127.0.0.1".to_string(),
            cors_origins,
            jwt_secret: "test-secret".to_string(),
            metrics_interval_secs: 2,
        })
    }

    async fn allow_origin_for(server: &MockServer, origin: &str) -> Option<String> {
        let response = server
            .build_router()
            .oneshot(
                Request::builder()
                    .method(Method::GET)
                    .uri("/health")
                    .header("Origin", origin)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        response
            .headers()
            .get("access-control-allow-origin")
            .map(|v| v.to_str().unwrap().to_string())
    }

    #[tokio::test]
    async fn test_local_dashboard_origin_always_allowed() {
        let server = server(vec![]);
        assert_eq!(
            allow_origin_for(&server, "http://localhost:3000").await,
            Some("http://localhost:3000".to_string())
        );
    }

    #[tokio::test]
    async fn test_configured_origin_extends_local_defaults() {
        let server = server(vec!["https://dash.example".to_string()]);

        assert_eq!(
            allow_origin_for(&server, "https://dash.example").await,
            Some("https://dash.example".to_string())
        );
        // Local development keeps working with a whitelist configured
        assert_eq!(
            allow_origin_for(&server, "http://127.0.0.1:3000").await,
            Some("http://127.0.0.1:3000".to_string())
        );
    }

    #[tokio::test]
    async fn test_unlisted_origin_gets_no_cors_headers() {
        let server = server(vec!["https://dash.example".to_string()]);
        assert_eq!(allow_origin_for(&server, "https://evil.example").await, None);
    }
}
