//! Real-time update layer
//!
//! One shared WebSocket connection multiplexing the named update channels,
//! with automatic reconnection, room-scoped subscriptions, and per-asset
//! scan progress tracking.

pub mod channels;
pub mod connection;
pub mod rooms;
pub mod scan;

pub use channels::{Channel, EventBus, SubscriptionId};
pub use connection::{ConnectionState, RealtimeClient, ReconnectSchedule, TokenProvider};
pub use rooms::{asset_room, RoomGuard};
pub use scan::{ScanMonitor, ScanPhase, ScanState};
