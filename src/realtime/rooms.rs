//! Room scoping
//!
//! Rooms are a server-side filter: the client only sends join/leave
//! intents and never tracks membership locally. Intents are
//! fire-and-forget; sending them without a live connection is a silent
//! no-op, so leave-before-join can never fail.

use tracing::debug;

use crate::models::ClientIntent;

use super::connection::RealtimeClient;

/// The room carrying one asset's scan-progress stream
pub fn asset_room(asset_id: &str) -> String {
    format!("asset:{}", asset_id)
}

impl RealtimeClient {
    /// Ask the server to scope this connection into a room
    pub fn join_room(&self, room: &str) {
        debug!(%room, "joining room");
        self.send_intent(ClientIntent::JoinRoom {
            room: room.to_string(),
        });
    }

    /// Ask the server to remove this connection from a room; callers are
    /// responsible for leaving the rooms they joined, typically on
    /// teardown
    pub fn leave_room(&self, room: &str) {
        debug!(%room, "leaving room");
        self.send_intent(ClientIntent::LeaveRoom {
            room: room.to_string(),
        });
    }

    /// Join a room and get a guard that leaves it on drop
    pub fn room(&self, room: &str) -> RoomGuard {
        self.join_room(room);
        RoomGuard {
            client: self.clone(),
            room: room.to_string(),
        }
    }
}

/// Keeps a room joined for its lifetime; leaves symmetrically on drop
pub struct RoomGuard {
    client: RealtimeClient,
    room: String,
}

impl RoomGuard {
    pub fn room(&self) -> &str {
        &self.room
    }
}

impl Drop for RoomGuard {
    fn drop(&mut self) {
        self.client.leave_room(&self.room);
    }
}
