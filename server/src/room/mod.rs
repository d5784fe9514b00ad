//! Per-room actors and the registry that owns them.
//!
//! Exactly one live actor exists per room id. The manager spawns the actor
//! task on create and drops its handle when the actor exits, so a torn-down
//! room immediately stops resolving.

pub mod actor;
pub mod commands;
pub mod events;
pub mod handle;
pub mod snapshot;
pub mod state;

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, RwLock};
use uuid::Uuid;

use crate::advisor::Advisor;
use crate::config::RoomConfig;

use actor::run_room_actor;
pub use commands::{JoinRole, MoveOutcome, RoomError};
pub use events::RoomEvent;
pub use handle::RoomHandle;
pub use snapshot::{
    ChatEntry, ClockView, DrawOffer, EndReason, MoveRecord, OfferStatus, PlayerView,
    RematchRequest, RoomSnapshot, RoomStatus, SpectatorView,
};
use state::RoomState;

/// Inputs for `create_room`. The host takes the first (white) seat.
#[derive(Debug, Clone)]
pub struct CreateRoomRequest {
    pub name: String,
    pub host_id: String,
    pub host_name: String,
    pub rules: Option<String>,
    pub allow_spectators: bool,
    pub allow_ai: bool,
}

/// Maps room ids to live actors. One actor task per room; handles are
/// cheap clones of the command channel.
pub struct RoomManager {
    rooms: Arc<RwLock<HashMap<String, RoomHandle>>>,
    advisor: Arc<dyn Advisor>,
    config: RoomConfig,
}

impl RoomManager {
    pub fn new(advisor: Arc<dyn Advisor>, config: RoomConfig) -> Self {
        Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
            advisor,
            config,
        }
    }

    pub async fn create_room(
        &self,
        req: CreateRoomRequest,
    ) -> Result<RoomSnapshot, RoomError> {
        if req.name.trim().chars().count() < 2 {
            return Err(RoomError::Validation(
                "room name needs at least 2 characters".to_string(),
            ));
        }
        if req.host_id.is_empty() || req.host_name.is_empty() {
            return Err(RoomError::Validation("missing host identity".to_string()));
        }

        let room_id = Uuid::new_v4().to_string();
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let (event_tx, _) = broadcast::channel(100);

        let state = RoomState::new(
            room_id.clone(),
            req.name.trim().to_string(),
            req.host_id,
            req.host_name,
            req.rules.unwrap_or_else(|| "Standard".to_string()),
            req.allow_spectators,
            req.allow_ai,
            self.advisor.clone(),
            self.config.clone(),
        );
        let snapshot = state.snapshot();

        let rooms = self.rooms.clone();
        let id_for_cleanup = room_id.clone();
        tokio::spawn(async move {
            run_room_actor(state, cmd_rx, event_tx).await;
            // The actor is the room; once it exits the id must stop resolving.
            rooms.write().await.remove(&id_for_cleanup);
            tracing::info!(room = %id_for_cleanup, "room removed from registry");
        });

        let handle = RoomHandle::new(room_id.clone(), cmd_tx);
        self.rooms.write().await.insert(room_id, handle);
        Ok(snapshot)
    }

    pub async fn get(&self, room_id: &str) -> Result<RoomHandle, RoomError> {
        self.rooms
            .read()
            .await
            .get(room_id)
            .cloned()
            .ok_or_else(|| RoomError::NotFound(format!("room {room_id}")))
    }

    /// Force-close a room regardless of its state.
    pub async fn close_room(&self, room_id: &str) -> Result<(), RoomError> {
        let handle = {
            self.rooms
                .write()
                .await
                .remove(room_id)
                .ok_or_else(|| RoomError::NotFound(format!("room {room_id}")))?
        };
        handle.shutdown().await;
        Ok(())
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::NullAdvisor;
    use std::time::Duration;

    fn test_manager() -> RoomManager {
        RoomManager::new(Arc::new(NullAdvisor), RoomConfig::default())
    }

    fn create_request() -> CreateRoomRequest {
        CreateRoomRequest {
            name: "Casual Blitz".to_string(),
            host_id: "alice".to_string(),
            host_name: "Alice".to_string(),
            rules: None,
            allow_spectators: true,
            allow_ai: false,
        }
    }

    #[tokio::test]
    async fn create_and_resolve_room() {
        let manager = test_manager();
        let snapshot = manager.create_room(create_request()).await.unwrap();
        assert_eq!(snapshot.status, RoomStatus::Waiting);
        assert_eq!(snapshot.players.len(), 1);
        assert_eq!(snapshot.players[0].color, "white");
        assert_eq!(snapshot.rules, "Standard");

        let handle = manager.get(&snapshot.id).await.unwrap();
        assert_eq!(handle.snapshot().await.unwrap().name, "Casual Blitz");
    }

    #[tokio::test]
    async fn create_room_validates_input() {
        let manager = test_manager();
        let mut req = create_request();
        req.name = "x".to_string();
        assert!(matches!(
            manager.create_room(req).await,
            Err(RoomError::Validation(_))
        ));

        let mut req = create_request();
        req.host_id = String::new();
        assert!(matches!(
            manager.create_room(req).await,
            Err(RoomError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn unknown_room_is_not_found() {
        let manager = test_manager();
        assert!(matches!(
            manager.get("missing").await,
            Err(RoomError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn close_room_stops_the_actor() {
        let manager = test_manager();
        let snapshot = manager.create_room(create_request()).await.unwrap();
        let handle = manager.get(&snapshot.id).await.unwrap();

        manager.close_room(&snapshot.id).await.unwrap();
        assert!(manager.get(&snapshot.id).await.is_err());

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(handle.snapshot().await.is_err());
        // Second close fails cleanly.
        assert!(manager.close_room(&snapshot.id).await.is_err());
    }

    #[tokio::test]
    async fn teardown_unregisters_the_room() {
        let manager = test_manager();
        let snapshot = manager.create_room(create_request()).await.unwrap();
        let handle = manager.get(&snapshot.id).await.unwrap();

        // Last (only) human leaves; the actor exits and the registry entry
        // follows.
        handle.leave("alice").await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(manager.get(&snapshot.id).await.is_err());
        assert_eq!(manager.room_count().await, 0);
    }
}
