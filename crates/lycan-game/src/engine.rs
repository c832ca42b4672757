//! The game state engine: one per room.
//!
//! Owns the phase, the role quota, night tracking, the vote session and
//! the result. Participants and their roles live in the session registry;
//! every operation that depends on them takes the live roster as an
//! argument instead of caching it.

use lycan_protocol::{
    GameResult, NightTarget, Participant, Phase, RoleId, RoleQuota, UserId,
    VoteChoice, VoteState,
};
use rand::Rng;

use crate::{
    Deal, GameError, GameRules, NightAbility, NightEffect, NightProgress,
    NightTracker, VoteOutcome, VoteSession, VoteUpdate, deal, definition,
};

/// Result of an accepted night action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NightOutcome {
    /// What the actor learned, to be sent to them privately.
    pub effect: NightEffect,
    pub progress: NightProgress,
}

/// What a participant leaving changed in the game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Departure {
    /// Nothing in progress depended on them.
    Nothing,
    /// Night progress re-derived without them.
    Night(NightProgress),
    /// The vote re-checked without them.
    Vote(VoteUpdate),
}

/// Phase machine plus everything the phases track.
#[derive(Debug, Clone)]
pub struct GameState {
    phase: Phase,
    quota: RoleQuota,
    rules: GameRules,
    vote: Option<VoteSession>,
    result: Option<GameResult>,
    night: NightTracker,
    graveyard: Vec<RoleId>,
}

impl GameState {
    /// A room in `waiting` with an all-zero quota.
    pub fn new(rules: GameRules) -> Self {
        Self {
            phase: Phase::Waiting,
            quota: RoleQuota::new(),
            rules,
            vote: None,
            result: None,
            night: NightTracker::new(),
            graveyard: Vec::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn quota(&self) -> &RoleQuota {
        &self.quota
    }

    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    /// Replaces the role quota. Missing roles are filled in as zero.
    ///
    /// # Errors
    /// [`GameError::WrongPhase`] outside `waiting`.
    pub fn update_quota(&mut self, quota: RoleQuota) -> Result<(), GameError> {
        self.expect_phase(Phase::Waiting)?;
        self.quota = quota.normalized();
        Ok(())
    }

    /// Whether the current quota can start a game for `participants`.
    pub fn can_start(&self, participants: usize) -> bool {
        self.rules.can_start(&self.quota, participants)
    }

    /// Checks that the host may move the room to `to`.
    ///
    /// Allowed: the next phase in the cycle, or `waiting` from anywhere.
    /// `vote → finished` only happens by resolution. Starting the night
    /// also needs a quota that fits the room.
    ///
    /// # Errors
    /// [`GameError::InvalidTransition`] or [`GameError::ConfigInvalid`].
    pub fn check_transition(
        &self,
        to: Phase,
        participants: usize,
    ) -> Result<(), GameError> {
        let from = self.phase;
        if to == Phase::Waiting {
            return Ok(());
        }
        if to != from.next() || from == Phase::Vote {
            return Err(GameError::InvalidTransition { from, to });
        }
        if to == Phase::Night {
            self.rules.check_start(&self.quota, participants)?;
        }
        Ok(())
    }

    /// Host-requested phase change.
    ///
    /// Returns the deal when this started the night; the caller records
    /// each assignment on its session and tells the player.
    ///
    /// # Errors
    /// See [`check_transition`](Self::check_transition). Nothing changes
    /// on error.
    pub fn change_phase<R: Rng + ?Sized>(
        &mut self,
        to: Phase,
        participants: &[UserId],
        rng: &mut R,
    ) -> Result<Option<Deal>, GameError> {
        self.check_transition(to, participants.len())?;

        let dealt = if to == Phase::Night {
            let dealt = deal(&self.quota, participants, rng)?;
            self.graveyard = dealt.graveyard.clone();
            Some(dealt)
        } else {
            None
        };

        self.set_phase(to, participants);
        Ok(dealt)
    }

    /// Enters `to` without any checks, applying its side effects.
    ///
    /// Used for the automatic night → day and vote → finished moves.
    pub fn set_phase(&mut self, to: Phase, participants: &[UserId]) {
        match to {
            Phase::Waiting => {
                self.vote = None;
                self.result = None;
                self.night.reset();
                self.graveyard.clear();
            }
            Phase::Night => self.night.reset(),
            Phase::Day | Phase::Finished => {}
            Phase::Vote => {
                self.result = None;
                self.vote = Some(VoteSession::start(participants));
            }
        }
        tracing::debug!(from = %self.phase, to = %to, "phase entered");
        self.phase = to;
    }

    /// Leftover roles from the last deal.
    pub fn graveyard(&self) -> &[RoleId] {
        &self.graveyard
    }

    /// Runs `actor`'s night ability and marks them done.
    ///
    /// # Errors
    /// [`GameError::WrongPhase`] outside the night,
    /// [`GameError::AlreadyCompleted`], [`GameError::NoRole`], and for
    /// targeted abilities [`GameError::TargetRequired`],
    /// [`GameError::CannotTargetSelf`] or [`GameError::UnknownTarget`].
    /// Completion is only marked on success.
    pub fn night_action(
        &mut self,
        actor: UserId,
        target: Option<NightTarget>,
        roster: &[Participant],
    ) -> Result<NightOutcome, GameError> {
        self.expect_phase(Phase::Night)?;
        if self.night.has_completed(actor) {
            return Err(GameError::AlreadyCompleted(actor));
        }

        let role = roster
            .iter()
            .find(|p| p.user_id == actor)
            .and_then(|p| p.role)
            .ok_or(GameError::NoRole(actor))?;

        let effect = match definition(role).night_ability {
            NightAbility::None => NightEffect::Acknowledged,
            NightAbility::Companions => NightEffect::Companions {
                others: roster
                    .iter()
                    .filter(|p| p.user_id != actor && p.role == Some(RoleId::Werewolf))
                    .map(|p| p.user_name.clone())
                    .collect(),
            },
            NightAbility::Divination => match target {
                None => return Err(GameError::TargetRequired(role)),
                Some(NightTarget::Graveyard) => NightEffect::Graveyard {
                    roles: self.graveyard.clone(),
                },
                Some(NightTarget::Player { user_id }) => {
                    if user_id == actor {
                        return Err(GameError::CannotTargetSelf);
                    }
                    let seen = roster
                        .iter()
                        .find(|p| p.user_id == user_id)
                        .ok_or(GameError::UnknownTarget(user_id))?;
                    NightEffect::PlayerRole {
                        user_id,
                        user_name: seen.user_name.clone(),
                        role: seen.role.ok_or(GameError::NoRole(user_id))?,
                    }
                }
            },
        };

        let progress = self.night.mark_completed(actor, &players(roster))?;
        Ok(NightOutcome { effect, progress })
    }

    /// Night progress against the live roster.
    pub fn night_progress(&self, participants: &[UserId]) -> NightProgress {
        self.night.progress(participants)
    }

    /// Casts a ballot.
    ///
    /// A resolving ballot stores the result; moving to `finished` is up
    /// to the caller.
    ///
    /// # Errors
    /// [`GameError::VoteNotInProgress`] outside the vote phase, otherwise
    /// whatever [`VoteSession::record`] rejects.
    pub fn record_vote(
        &mut self,
        voter: UserId,
        choice: VoteChoice,
        roster: &[Participant],
    ) -> Result<VoteUpdate, GameError> {
        if self.phase != Phase::Vote {
            return Err(GameError::VoteNotInProgress);
        }
        let session = self.vote.as_mut().ok_or(GameError::VoteNotInProgress)?;
        let outcome = session.record(voter, choice, roster)?;
        let state = session.snapshot();

        if let VoteOutcome::Resolved(result) = &outcome {
            self.result = Some(result.clone());
        }
        Ok(VoteUpdate { state, outcome })
    }

    /// Current vote snapshot, kept after resolution until `waiting`.
    pub fn vote_state(&self) -> Option<VoteState> {
        self.vote.as_ref().map(VoteSession::snapshot)
    }

    pub fn result(&self) -> Option<&GameResult> {
        self.result.as_ref()
    }

    /// Re-derives night or vote state after `user` left. `roster` must
    /// already exclude them.
    pub fn handle_departure(&mut self, user: UserId, roster: &[Participant]) -> Departure {
        match self.phase {
            Phase::Night => {
                self.night.forget(user);
                Departure::Night(self.night.progress(&players(roster)))
            }
            Phase::Vote => {
                let Some(session) = self.vote.as_mut() else {
                    return Departure::Nothing;
                };
                if session.is_resolved() {
                    return Departure::Nothing;
                }
                let outcome = session.remove_participant(user, roster);
                let state = session.snapshot();
                if let VoteOutcome::Resolved(result) = &outcome {
                    self.result = Some(result.clone());
                }
                Departure::Vote(VoteUpdate { state, outcome })
            }
            _ => Departure::Nothing,
        }
    }

    fn expect_phase(&self, expected: Phase) -> Result<(), GameError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(GameError::WrongPhase {
                expected,
                actual: self.phase,
            })
        }
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new(GameRules::default())
    }
}

/// Participants holding a dealt role. Anyone who joined after the deal
/// watches without acting.
fn players(roster: &[Participant]) -> Vec<UserId> {
    roster
        .iter()
        .filter(|p| p.role.is_some())
        .map(|p| p.user_id)
        .collect()
}
