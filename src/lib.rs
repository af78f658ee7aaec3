//! Vigil - Security Audit Dashboard Client
//!
//! Client-side plumbing for a security-audit management dashboard.
//!
//! ## Features
//!
//! - Real-time WebSocket client with linear-backoff reconnection
//! - Channel multiplexing of a single socket into typed event streams
//! - Room-scoped subscriptions for per-asset scan progress
//! - Reactive query cache bridged to real-time invalidations
//! - Scan progress state machine with optimistic starts
//! - REST client with persisted session and forced-logout on expiry
//! - Mock REST/WebSocket server for development and tests

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod realtime;
pub mod server;

pub use cache::{QueryCache, QueryKey};
pub use client::{ApiClient, SessionStore};
pub use config::Config;
pub use error::{Result, VigilError};
pub use realtime::{ConnectionState, RealtimeClient};
