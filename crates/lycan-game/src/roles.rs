//! Role catalog: the team and night ability behind each role id.
//!
//! Presentation (names, icons, flavor text) lives with the client; the
//! server only needs what affects rules.

use lycan_protocol::{RoleId, RoleQuota, Team};

/// What a role does when the night phase asks it to act.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NightAbility {
    /// Nothing; the night action is a bare acknowledgement.
    None,
    /// Learns who the other werewolves are. Takes no target.
    Companions,
    /// Sees one player's role, or the graveyard. Needs a target.
    Divination,
}

impl NightAbility {
    /// Whether the ability is rejected without a target.
    pub fn needs_target(self) -> bool {
        matches!(self, Self::Divination)
    }
}

/// Rules-relevant facts about a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleDefinition {
    pub id: RoleId,
    pub team: Team,
    pub night_ability: NightAbility,
}

/// Looks up a role's definition.
pub fn definition(role: RoleId) -> RoleDefinition {
    let (team, night_ability) = match role {
        RoleId::Villager => (Team::Villagers, NightAbility::None),
        RoleId::Werewolf => (Team::Werewolves, NightAbility::Companions),
        RoleId::Seer => (Team::Villagers, NightAbility::Divination),
        RoleId::Tanner => (Team::Neutral, NightAbility::None),
    };
    RoleDefinition {
        id: role,
        team,
        night_ability,
    }
}

/// Number of tokens in `quota` that play for `team`.
pub fn team_count(quota: &RoleQuota, team: Team) -> usize {
    quota
        .iter()
        .filter(|(role, _)| definition(*role).team == team)
        .map(|(_, count)| count as usize)
        .sum()
}
