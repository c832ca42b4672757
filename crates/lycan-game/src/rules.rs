//! Per-room rule tunables and the "can start" check.

use lycan_protocol::{RoleQuota, Team};
use serde::{Deserialize, Serialize};

use crate::{GameError, team_count};

/// Rule settings for one room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameRules {
    /// Roles dealt beyond one per participant. The surplus goes to the
    /// graveyard.
    pub extra_role_slots: usize,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            extra_role_slots: 2,
        }
    }
}

impl GameRules {
    /// Whether `quota` can start a game for `participants` people.
    pub fn can_start(&self, quota: &RoleQuota, participants: usize) -> bool {
        self.check_start(quota, participants).is_ok()
    }

    /// Like [`can_start`](Self::can_start), but says why not.
    ///
    /// # Errors
    /// [`GameError::ConfigInvalid`] unless the room is non-empty, the
    /// total is exactly `participants + extra_role_slots`, and both the
    /// werewolf and villager sides have at least one role.
    pub fn check_start(
        &self,
        quota: &RoleQuota,
        participants: usize,
    ) -> Result<(), GameError> {
        let total = quota.total();
        let fits = participants > 0
            && total == participants + self.extra_role_slots
            && team_count(quota, Team::Werewolves) > 0
            && team_count(quota, Team::Villagers) > 0;

        if fits {
            Ok(())
        } else {
            Err(GameError::ConfigInvalid {
                total,
                participants,
                extra: self.extra_role_slots,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lycan_protocol::RoleId;

    fn quota(villagers: u32, werewolves: u32) -> RoleQuota {
        RoleQuota::from_counts([
            (RoleId::Villager, villagers),
            (RoleId::Werewolf, werewolves),
        ])
    }

    #[test]
    fn test_can_start_needs_two_extra_slots() {
        let rules = GameRules::default();
        assert!(!rules.can_start(&quota(3, 1), 3));
        assert!(rules.can_start(&quota(3, 2), 3));
    }

    #[test]
    fn test_can_start_requires_a_werewolf() {
        let rules = GameRules::default();
        assert!(!rules.can_start(&quota(5, 0), 3));
    }

    #[test]
    fn test_can_start_requires_a_villager_side_role() {
        let rules = GameRules::default();
        let all_wolves = quota(0, 5);
        assert!(!rules.can_start(&all_wolves, 3));

        let mut with_seer = all_wolves.clone();
        with_seer.set(RoleId::Werewolf, 4);
        with_seer.set(RoleId::Seer, 1);
        assert!(rules.can_start(&with_seer, 3));
    }

    #[test]
    fn test_can_start_empty_room_is_false() {
        let rules = GameRules {
            extra_role_slots: 0,
        };
        assert!(!rules.can_start(&RoleQuota::new(), 0));
    }

    #[test]
    fn test_check_start_reports_counts() {
        let err = GameRules::default()
            .check_start(&quota(3, 1), 3)
            .unwrap_err();
        assert_eq!(
            err,
            GameError::ConfigInvalid {
                total: 4,
                participants: 3,
                extra: 2
            }
        );
    }
}
