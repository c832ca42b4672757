//! Room manager: creates rooms on first join and routes leaves.

use std::collections::HashMap;

use lycan_protocol::{RoomId, UserId};
use lycan_session::{OutboundSender, SessionId};

use crate::room::spawn_room;
use crate::{RoomConfig, RoomError, RoomHandle, RoomInfo};

/// Every live room, keyed by name.
///
/// Rooms are independent: the manager only creates, finds and destroys
/// them. A room is destroyed as soon as its last participant leaves.
#[derive(Debug, Default)]
pub struct RoomManager {
    rooms: HashMap<RoomId, RoomHandle>,
    config: RoomConfig,
}

impl RoomManager {
    /// Creates an empty manager whose rooms use `config`.
    pub fn new(config: RoomConfig) -> Self {
        Self {
            rooms: HashMap::new(),
            config,
        }
    }

    /// Joins `room_id`, creating the room first if it doesn't exist.
    ///
    /// Returns the room's handle for routing later commands.
    pub async fn join_or_create(
        &mut self,
        room_id: RoomId,
        session_id: SessionId,
        user_id: UserId,
        user_name: String,
        outbound: OutboundSender,
    ) -> Result<RoomHandle, RoomError> {
        let handle = match self.rooms.get(&room_id) {
            Some(handle) => handle.clone(),
            None => {
                let handle = spawn_room(room_id.clone(), &self.config);
                self.rooms.insert(room_id.clone(), handle.clone());
                tracing::info!(room = %room_id, "room created");
                handle
            }
        };

        if let Err(e) = handle.join(session_id, user_id, user_name, outbound).await {
            if matches!(e, RoomError::Unavailable(_)) {
                self.rooms.remove(&room_id);
            }
            return Err(e);
        }
        Ok(handle)
    }

    /// Removes a session from its room. Destroys the room if it is now
    /// empty.
    pub async fn leave(
        &mut self,
        room_id: &RoomId,
        session_id: SessionId,
    ) -> Result<(), RoomError> {
        let handle = self
            .rooms
            .get(room_id)
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))?;

        let remaining = handle.leave(session_id).await?;
        if remaining == 0 {
            self.destroy_room(room_id).await?;
        }
        Ok(())
    }

    /// Shuts a room down and forgets it.
    pub async fn destroy_room(&mut self, room_id: &RoomId) -> Result<(), RoomError> {
        let handle = self
            .rooms
            .remove(room_id)
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))?;
        let _ = handle.shutdown().await;
        tracing::info!(room = %room_id, "room destroyed");
        Ok(())
    }

    /// Returns info about a specific room.
    pub async fn get_room_info(&self, room_id: &RoomId) -> Result<RoomInfo, RoomError> {
        let handle = self
            .rooms
            .get(room_id)
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))?;
        handle.get_info().await
    }

    /// Returns the number of live rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Lists all live room names.
    pub fn room_ids(&self) -> Vec<RoomId> {
        self.rooms.keys().cloned().collect()
    }
}
