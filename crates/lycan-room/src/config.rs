//! Room configuration.

use lycan_game::GameRules;
use serde::{Deserialize, Serialize};

/// Settings shared by every room a manager creates.
///
/// Loaded from the `[room]` table of the server config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomConfig {
    /// Roles dealt beyond one per participant.
    pub extra_role_slots: usize,

    /// Capacity of each room actor's command channel.
    pub command_buffer: usize,
}

impl RoomConfig {
    /// Game rules for a room with this config.
    pub fn rules(&self) -> GameRules {
        GameRules {
            extra_role_slots: self.extra_role_slots,
        }
    }
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            extra_role_slots: GameRules::default().extra_role_slots,
            command_buffer: 64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_config_default() {
        let config = RoomConfig::default();
        assert_eq!(config.extra_role_slots, 2);
        assert_eq!(config.command_buffer, 64);
        assert_eq!(config.rules(), GameRules::default());
    }

    #[test]
    fn test_room_config_partial_fills_defaults() {
        let config: RoomConfig =
            serde_json::from_str(r#"{"extra_role_slots":0}"#).unwrap();
        assert_eq!(config.extra_role_slots, 0);
        assert_eq!(config.command_buffer, 64);
        assert_eq!(config.rules().extra_role_slots, 0);
    }
}
