//! Night-action tracking.
//!
//! The required set is never stored: callers pass the live roster on
//! every check so a participant who left can't stall the night.

use std::collections::HashSet;

use lycan_protocol::{RoleId, UserId};

use crate::GameError;

/// Who has acted this night.
#[derive(Debug, Clone, Default)]
pub struct NightTracker {
    completed: HashSet<UserId>,
}

/// Completion status against a required set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NightProgress {
    pub completed: usize,
    pub remaining: usize,
    /// `true` once every required participant has acted. Never `true`
    /// for an empty required set.
    pub all_completed: bool,
}

impl NightTracker {
    /// Creates a tracker with nobody completed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new night.
    pub fn reset(&mut self) {
        self.completed.clear();
    }

    /// Marks `user` as done for this night.
    ///
    /// # Errors
    /// [`GameError::AlreadyCompleted`] if `user` already acted. The
    /// completed count is unchanged.
    pub fn mark_completed(
        &mut self,
        user: UserId,
        required: &[UserId],
    ) -> Result<NightProgress, GameError> {
        if !self.completed.insert(user) {
            return Err(GameError::AlreadyCompleted(user));
        }
        Ok(self.progress(required))
    }

    /// Whether `user` already acted.
    pub fn has_completed(&self, user: UserId) -> bool {
        self.completed.contains(&user)
    }

    /// Progress against the current roster.
    pub fn progress(&self, required: &[UserId]) -> NightProgress {
        let completed = required
            .iter()
            .filter(|u| self.completed.contains(*u))
            .count();
        // `completed` counts a subset of `required`.
        let remaining = required.len() - completed;
        NightProgress {
            completed,
            remaining,
            all_completed: !required.is_empty() && remaining == 0,
        }
    }

    /// Drops a departed participant.
    pub fn forget(&mut self, user: UserId) {
        self.completed.remove(&user);
    }
}

/// What a night action revealed to the actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NightEffect {
    /// No ability; the action only marks completion.
    Acknowledged,
    /// The other werewolves, by display name.
    Companions { others: Vec<String> },
    /// One player's role.
    PlayerRole {
        user_id: UserId,
        user_name: String,
        role: RoleId,
    },
    /// The leftover roles.
    Graveyard { roles: Vec<RoleId> },
}

impl NightEffect {
    /// Text for the private reveal. `None` when there is nothing to say.
    pub fn describe(&self) -> Option<String> {
        match self {
            Self::Acknowledged => None,
            Self::Companions { others } if others.is_empty() => {
                Some("You are the only werewolf.".to_owned())
            }
            Self::Companions { others } => {
                Some(format!("Your fellow werewolves: {}.", others.join(", ")))
            }
            Self::PlayerRole {
                user_name, role, ..
            } => Some(format!("{user_name} is a {role}.")),
            Self::Graveyard { roles } if roles.is_empty() => {
                Some("The graveyard is empty.".to_owned())
            }
            Self::Graveyard { roles } => {
                let names: Vec<String> = roles.iter().map(ToString::to_string).collect();
                Some(format!("The graveyard holds: {}.", names.join(", ")))
            }
        }
    }
}
