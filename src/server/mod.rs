//! Mock REST/WebSocket server
//!
//! A development and test fixture: serves the REST endpoints from seeded
//! in-memory data and emits synthetic real-time events. There is no
//! persistence and no real scanning engine.

pub mod auth;
pub mod cors;
pub mod handlers;
pub mod mock_data;
pub mod routes;
pub mod state;
pub mod synthetic;
pub mod ws;

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

use crate::config::MockServerConfig;
use crate::error::Result;

pub use state::{MockState, RoomEvent};
pub use synthetic::{SyntheticConfig, SyntheticGenerator};

/// The mock server
pub struct MockServer {
    config: MockServerConfig,
    state: MockState,
}

impl MockServer {
    pub fn new(config: MockServerConfig) -> Self {
        let state = MockState::new(&config.jwt_secret);
        Self { config, state }
    }

    pub fn state(&self) -> &MockState {
        &self.state
    }

    /// Build the router; public so tests can serve it on ephemeral ports
    pub fn build_router(&self) -> Router {
        let cors = cors::cors_layer(&self.config.cors_origins);

        routes::create_router(self.state.clone())
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server and the synthetic generator until shutdown
    #[instrument(skip(self, shutdown))]
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .map_err(|_| {
                crate::error::VigilError::InvalidConfig("invalid mock server address".into())
            })?;

        let generator = SyntheticGenerator::new(
            self.state.clone(),
            SyntheticConfig {
                metrics_interval: Duration::from_secs(self.config.metrics_interval_secs.max(1)),
                ..SyntheticConfig::default()
            },
        );
        let generator_shutdown = shutdown.clone();
        let generator_task = tokio::spawn(async move {
            generator.run(generator_shutdown).await;
        });

        let router = self.build_router();
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("mock server listening on {}", addr);

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.changed().await;
            })
            .await
            .map_err(|e| crate::error::VigilError::Internal(e.to_string()))?;

        let _ = generator_task.await;
        info!("mock server shut down");
        Ok(())
    }
}
