//! The vote protocol: multi-round majority vote with tie-break revotes.
//!
//! A round is tallied once every eligible voter has a ballot. Unset
//! ballots count as abstentions when a departure forces a tally early.
//!
//! On a tie the tied suspects lose their vote: the next round's voters
//! are the original participants minus everyone tied at the top, and
//! the candidates are the tied players. Abstain is no longer a
//! tie-breaking option once it only ties.

use std::collections::{BTreeMap, BTreeSet};

use lycan_protocol::{
    GameResult, Participant, ResultReason, Team, UserId, VoteChoice, VoteCount,
    VoteRoundSummary, VoteState, VoteStatus, Winner,
};

use crate::{GameError, definition};

/// One vote session, from `start` until it resolves.
#[derive(Debug, Clone)]
pub struct VoteSession {
    round: u32,
    eligible: BTreeSet<UserId>,
    candidates: BTreeSet<UserId>,
    votes: BTreeMap<UserId, VoteChoice>,
    status: VoteStatus,
    history: Vec<VoteRoundSummary>,
    /// Everyone who was in the room when the vote opened and is still
    /// connected. Revote voters are drawn from here.
    all_participants: BTreeSet<UserId>,
}

/// Counted ballots of one round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tally {
    pub counts: BTreeMap<VoteChoice, u32>,
    /// The buckets tied for the highest count.
    pub top_choices: Vec<VoteChoice>,
}

impl Tally {
    fn summary(&self, round: u32) -> VoteRoundSummary {
        VoteRoundSummary {
            round,
            counts: self
                .counts
                .iter()
                .map(|(choice, votes)| VoteCount {
                    choice: *choice,
                    votes: *votes,
                })
                .collect(),
            top_choices: self.top_choices.clone(),
            resolved: self.top_choices.len() == 1,
        }
    }
}

/// What recording a ballot (or a departure) led to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteOutcome {
    /// Still waiting on ballots.
    Pending,
    /// The round tied and a new round opened.
    Revote,
    /// The vote is over.
    Resolved(GameResult),
}

/// A vote snapshot plus what produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteUpdate {
    pub state: VoteState,
    pub outcome: VoteOutcome,
}

impl VoteSession {
    /// Opens round 1: everyone votes and everyone is a candidate.
    pub fn start(participants: &[UserId]) -> Self {
        let everyone: BTreeSet<UserId> = participants.iter().copied().collect();
        Self {
            round: 1,
            eligible: everyone.clone(),
            candidates: everyone.clone(),
            votes: BTreeMap::new(),
            status: VoteStatus::Open,
            history: Vec::new(),
            all_participants: everyone,
        }
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn status(&self) -> VoteStatus {
        self.status
    }

    pub fn is_resolved(&self) -> bool {
        self.status == VoteStatus::Resolved
    }

    /// Public snapshot: one `votes` entry per eligible voter.
    pub fn snapshot(&self) -> VoteState {
        VoteState {
            round: self.round,
            eligible_voters: self.eligible.iter().copied().collect(),
            candidates: self.candidates.iter().copied().collect(),
            votes: self
                .eligible
                .iter()
                .map(|voter| (*voter, self.votes.get(voter).copied()))
                .collect(),
            status: self.status,
            history: self.history.clone(),
        }
    }

    /// Whether every eligible voter has a ballot in.
    pub fn is_complete(&self) -> bool {
        self.eligible.iter().all(|v| self.votes.contains_key(v))
    }

    /// Counts the current round without changing anything.
    pub fn tally(&self) -> Tally {
        let mut counts: BTreeMap<VoteChoice, u32> = BTreeMap::new();
        for voter in &self.eligible {
            let choice = self.votes.get(voter).copied().unwrap_or(VoteChoice::Abstain);
            *counts.entry(choice).or_default() += 1;
        }

        let max = counts.values().copied().max().unwrap_or(0);
        let top_choices = counts
            .iter()
            .filter(|(_, n)| **n == max)
            .map(|(choice, _)| *choice)
            .collect();

        Tally {
            counts,
            top_choices,
        }
    }

    /// Records (or replaces) `voter`'s ballot and settles the round if
    /// it is now complete.
    ///
    /// `roster` is the live participant list with roles; it is used to
    /// look up the executed player's team.
    ///
    /// # Errors
    /// [`GameError::VoteNotInProgress`] once resolved,
    /// [`GameError::NotEligible`], [`GameError::CannotTargetSelf`] and
    /// [`GameError::InvalidCandidate`]. A rejected ballot changes nothing.
    pub fn record(
        &mut self,
        voter: UserId,
        choice: VoteChoice,
        roster: &[Participant],
    ) -> Result<VoteOutcome, GameError> {
        if self.is_resolved() {
            return Err(GameError::VoteNotInProgress);
        }
        if !self.eligible.contains(&voter) {
            return Err(GameError::NotEligible(voter));
        }
        if let Some(target) = choice.target() {
            if target == voter {
                return Err(GameError::CannotTargetSelf);
            }
            if !self.candidates.contains(&target) {
                return Err(GameError::InvalidCandidate(target));
            }
        }

        self.votes.insert(voter, choice);
        Ok(self.settle(roster))
    }

    /// Drops a departed participant from every set and re-checks the
    /// round. Ballots naming them are cleared so their voters vote again.
    pub fn remove_participant(
        &mut self,
        user: UserId,
        roster: &[Participant],
    ) -> VoteOutcome {
        if self.is_resolved() {
            return VoteOutcome::Pending;
        }

        self.eligible.remove(&user);
        self.candidates.remove(&user);
        self.all_participants.remove(&user);
        self.votes.remove(&user);
        self.votes.retain(|_, choice| choice.target() != Some(user));

        self.settle(roster)
    }

    fn settle(&mut self, roster: &[Participant]) -> VoteOutcome {
        if !self.is_complete() {
            return VoteOutcome::Pending;
        }

        let tally = self.tally();
        self.history.push(tally.summary(self.round));

        match tally.top_choices.as_slice() {
            [] => self.resolve(no_resolution()),
            [VoteChoice::Abstain] => self.resolve(GameResult::without_execution(
                Winner::Werewolves,
                ResultReason::Abstain,
            )),
            [VoteChoice::Player { user_id }] => self.resolve(execution(*user_id, roster)),
            tied => {
                let tied_players: BTreeSet<UserId> =
                    tied.iter().filter_map(VoteChoice::target).collect();
                let next_voters: BTreeSet<UserId> = self
                    .all_participants
                    .difference(&tied_players)
                    .copied()
                    .collect();

                if next_voters.is_empty() {
                    return self.resolve(no_resolution());
                }

                self.round += 1;
                self.status = VoteStatus::Revote;
                self.candidates = tied_players;
                self.eligible = next_voters;
                self.votes.clear();
                tracing::debug!(round = self.round, "vote tied, revote opened");
                VoteOutcome::Revote
            }
        }
    }

    fn resolve(&mut self, result: GameResult) -> VoteOutcome {
        self.status = VoteStatus::Resolved;
        VoteOutcome::Resolved(result)
    }
}

fn no_resolution() -> GameResult {
    GameResult::without_execution(Winner::Werewolves, ResultReason::NoResolution)
}

fn execution(executed: UserId, roster: &[Participant]) -> GameResult {
    let Some((participant, role)) = roster
        .iter()
        .find(|p| p.user_id == executed)
        .and_then(|p| p.role.map(|role| (p, role)))
    else {
        return GameResult::without_execution(Winner::None, ResultReason::NoResolution);
    };

    let team = definition(role).team;
    let winner_team = match team {
        Team::Werewolves => Winner::Villagers,
        Team::Villagers => Winner::Werewolves,
        Team::Neutral => Winner::None,
    };

    GameResult {
        winner_team,
        reason: ResultReason::Execution,
        executed_user_id: Some(executed),
        executed_user_name: Some(participant.user_name.clone()),
        executed_role: Some(role),
        executed_team: Some(team),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lycan_protocol::RoleId;

    fn ids(raw: &[u64]) -> Vec<UserId> {
        raw.iter().copied().map(UserId).collect()
    }

    fn roster(roles: &[(u64, RoleId)]) -> Vec<Participant> {
        roles
            .iter()
            .map(|(id, role)| Participant {
                user_id: UserId(*id),
                user_name: format!("p{id}"),
                is_host: *id == 1,
                role: Some(*role),
            })
            .collect()
    }

    fn villagers(n: u64) -> Vec<Participant> {
        let roles: Vec<_> = (1..=n).map(|id| (id, RoleId::Villager)).collect();
        roster(&roles)
    }

    fn player(id: u64) -> VoteChoice {
        VoteChoice::Player {
            user_id: UserId(id),
        }
    }

    #[test]
    fn test_start_everyone_votes_and_is_candidate() {
        let session = VoteSession::start(&ids(&[1, 2, 3]));
        let state = session.snapshot();
        assert_eq!(state.round, 1);
        assert_eq!(state.status, VoteStatus::Open);
        assert_eq!(state.eligible_voters, ids(&[1, 2, 3]));
        assert_eq!(state.candidates, ids(&[1, 2, 3]));
        assert!(state.votes.values().all(Option::is_none));
        assert!(state.history.is_empty());
    }

    #[test]
    fn test_record_self_vote_rejected() {
        let mut session = VoteSession::start(&ids(&[1, 2]));
        let err = session.record(UserId(1), player(1), &villagers(2));
        assert_eq!(err, Err(GameError::CannotTargetSelf));
        assert_eq!(session.snapshot().votes[&UserId(1)], None);
    }

    #[test]
    fn test_record_unknown_voter_and_candidate_rejected() {
        let mut session = VoteSession::start(&ids(&[1, 2]));
        let roster = villagers(2);
        assert_eq!(
            session.record(UserId(9), player(1), &roster),
            Err(GameError::NotEligible(UserId(9)))
        );
        assert_eq!(
            session.record(UserId(1), player(9), &roster),
            Err(GameError::InvalidCandidate(UserId(9)))
        );
    }

    #[test]
    fn test_record_replaces_previous_ballot() {
        let mut session = VoteSession::start(&ids(&[1, 2, 3]));
        let roster = villagers(3);
        session.record(UserId(1), player(2), &roster).unwrap();
        session.record(UserId(1), player(3), &roster).unwrap();
        assert_eq!(session.snapshot().votes[&UserId(1)], Some(player(3)));
    }

    #[test]
    fn test_record_unanimous_vote_on_werewolf_villagers_win() {
        let roster = roster(&[
            (1, RoleId::Villager),
            (2, RoleId::Villager),
            (3, RoleId::Seer),
            (4, RoleId::Villager),
            (5, RoleId::Werewolf),
        ]);
        let mut session = VoteSession::start(&ids(&[1, 2, 3, 4, 5]));

        for voter in 1..=4 {
            let outcome = session.record(UserId(voter), player(5), &roster).unwrap();
            assert_eq!(outcome, VoteOutcome::Pending);
        }
        let outcome = session.record(UserId(5), player(1), &roster).unwrap();

        let VoteOutcome::Resolved(result) = outcome else {
            panic!("expected resolution, got {outcome:?}");
        };
        assert_eq!(result.winner_team, Winner::Villagers);
        assert_eq!(result.reason, ResultReason::Execution);
        assert_eq!(result.executed_user_id, Some(UserId(5)));
        assert_eq!(result.executed_role, Some(RoleId::Werewolf));
        assert_eq!(result.executed_team, Some(Team::Werewolves));

        let state = session.snapshot();
        assert_eq!(state.status, VoteStatus::Resolved);
        assert_eq!(state.history.len(), 1);
        assert!(state.history[0].resolved);
    }

    #[test]
    fn test_record_executing_villager_werewolves_win() {
        let roster = roster(&[(1, RoleId::Werewolf), (2, RoleId::Villager), (3, RoleId::Villager)]);
        let mut session = VoteSession::start(&ids(&[1, 2, 3]));
        session.record(UserId(1), player(2), &roster).unwrap();
        session.record(UserId(3), player(2), &roster).unwrap();
        let outcome = session.record(UserId(2), player(1), &roster).unwrap();
        let VoteOutcome::Resolved(result) = outcome else {
            panic!("expected resolution");
        };
        assert_eq!(result.winner_team, Winner::Werewolves);
    }

    #[test]
    fn test_record_executing_tanner_nobody_wins() {
        let roster = roster(&[(1, RoleId::Tanner), (2, RoleId::Villager), (3, RoleId::Werewolf)]);
        let mut session = VoteSession::start(&ids(&[1, 2, 3]));
        session.record(UserId(2), player(1), &roster).unwrap();
        session.record(UserId(3), player(1), &roster).unwrap();
        let outcome = session.record(UserId(1), VoteChoice::Abstain, &roster).unwrap();
        let VoteOutcome::Resolved(result) = outcome else {
            panic!("expected resolution");
        };
        assert_eq!(result.winner_team, Winner::None);
        assert_eq!(result.reason, ResultReason::Execution);
    }

    #[test]
    fn test_record_executed_without_role_is_no_resolution() {
        let mut roster = villagers(3);
        roster[2].role = None;
        let mut session = VoteSession::start(&ids(&[1, 2, 3]));
        session.record(UserId(1), player(3), &roster).unwrap();
        session.record(UserId(2), player(3), &roster).unwrap();
        let outcome = session.record(UserId(3), player(1), &roster).unwrap();
        assert_eq!(
            outcome,
            VoteOutcome::Resolved(GameResult::without_execution(
                Winner::None,
                ResultReason::NoResolution
            ))
        );
    }

    #[test]
    fn test_record_majority_abstain_werewolves_win() {
        let mut session = VoteSession::start(&ids(&[1, 2, 3]));
        let roster = villagers(3);
        session.record(UserId(1), VoteChoice::Abstain, &roster).unwrap();
        session.record(UserId(2), VoteChoice::Abstain, &roster).unwrap();
        let outcome = session.record(UserId(3), player(1), &roster).unwrap();
        assert_eq!(
            outcome,
            VoteOutcome::Resolved(GameResult::without_execution(
                Winner::Werewolves,
                ResultReason::Abstain
            ))
        );
    }

    #[test]
    fn test_record_two_way_tie_bars_suspects_from_revote() {
        // A=1, B=2; voters 3 and 4 split, A and B vote for each other.
        let mut session = VoteSession::start(&ids(&[1, 2, 3, 4]));
        let roster = villagers(4);
        session.record(UserId(1), player(2), &roster).unwrap();
        session.record(UserId(2), player(1), &roster).unwrap();
        session.record(UserId(3), player(1), &roster).unwrap();
        let outcome = session.record(UserId(4), player(2), &roster).unwrap();
        assert_eq!(outcome, VoteOutcome::Revote);

        let state = session.snapshot();
        assert_eq!(state.round, 2);
        assert_eq!(state.status, VoteStatus::Revote);
        assert_eq!(state.eligible_voters, ids(&[3, 4]));
        assert_eq!(state.candidates, ids(&[1, 2]));
        assert!(state.votes.values().all(Option::is_none));
        assert_eq!(state.history.len(), 1);
        assert!(!state.history[0].resolved);
        assert_eq!(state.history[0].top_choices, vec![player(1), player(2)]);

        // Tied suspects can no longer vote.
        assert_eq!(
            session.record(UserId(1), player(2), &roster),
            Err(GameError::NotEligible(UserId(1)))
        );
        // Only tied players remain candidates.
        assert_eq!(
            session.record(UserId(3), player(4), &roster),
            Err(GameError::InvalidCandidate(UserId(4)))
        );
    }

    #[test]
    fn test_record_everyone_tied_out_is_no_resolution() {
        // Three-way cycle: every participant is a tied top choice.
        let mut session = VoteSession::start(&ids(&[1, 2, 3]));
        let roster = villagers(3);
        session.record(UserId(1), player(2), &roster).unwrap();
        session.record(UserId(2), player(3), &roster).unwrap();
        let outcome = session.record(UserId(3), player(1), &roster).unwrap();
        assert_eq!(outcome, VoteOutcome::Resolved(no_resolution()));
        assert_eq!(session.snapshot().status, VoteStatus::Resolved);
    }

    #[test]
    fn test_record_tie_with_abstain_keeps_abstain_out_of_candidates() {
        // Abstain and player 2 tie at two ballots each.
        let mut session = VoteSession::start(&ids(&[1, 2, 3, 4]));
        let roster = villagers(4);
        session.record(UserId(1), VoteChoice::Abstain, &roster).unwrap();
        session.record(UserId(3), player(2), &roster).unwrap();
        session.record(UserId(4), player(2), &roster).unwrap();
        let outcome = session.record(UserId(2), VoteChoice::Abstain, &roster).unwrap();
        assert_eq!(outcome, VoteOutcome::Revote);

        let state = session.snapshot();
        assert_eq!(state.candidates, ids(&[2]));
        assert_eq!(state.eligible_voters, ids(&[1, 3, 4]));
    }

    #[test]
    fn test_revote_single_voter_abstains_werewolves_win() {
        let mut session = VoteSession::start(&ids(&[1, 2, 3]));
        let roster = villagers(3);
        session.record(UserId(1), player(2), &roster).unwrap();
        session.record(UserId(2), player(1), &roster).unwrap();
        let outcome = session.record(UserId(3), VoteChoice::Abstain, &roster).unwrap();
        // Three-way tie between 1, 2 and abstain; only 3 votes next.
        assert_eq!(outcome, VoteOutcome::Revote);
        assert_eq!(session.snapshot().eligible_voters, ids(&[3]));

        let outcome = session.record(UserId(3), VoteChoice::Abstain, &roster).unwrap();
        assert_eq!(
            outcome,
            VoteOutcome::Resolved(GameResult::without_execution(
                Winner::Werewolves,
                ResultReason::Abstain
            ))
        );
        assert_eq!(session.snapshot().history.len(), 2);
    }

    #[test]
    fn test_record_after_resolution_rejected() {
        let mut session = VoteSession::start(&ids(&[1, 2]));
        let roster = villagers(2);
        session.record(UserId(1), VoteChoice::Abstain, &roster).unwrap();
        session.record(UserId(2), VoteChoice::Abstain, &roster).unwrap();
        assert_eq!(
            session.record(UserId(1), VoteChoice::Abstain, &roster),
            Err(GameError::VoteNotInProgress)
        );
    }

    #[test]
    fn test_tally_is_pure_snapshot_unchanged() {
        let mut session = VoteSession::start(&ids(&[1, 2, 3]));
        session.record(UserId(1), player(2), &villagers(3)).unwrap();

        let before = session.snapshot();
        let tally = session.tally();
        assert_eq!(session.snapshot(), before);

        // Unset ballots count as abstentions.
        assert_eq!(tally.counts[&VoteChoice::Abstain], 2);
        assert_eq!(tally.counts[&player(2)], 1);
        assert_eq!(tally.top_choices, vec![VoteChoice::Abstain]);
    }

    #[test]
    fn test_remove_participant_clears_ballots_naming_them() {
        let roster = roster(&[(1, RoleId::Villager), (2, RoleId::Werewolf), (3, RoleId::Villager)]);
        let mut session = VoteSession::start(&ids(&[1, 2, 3]));
        session.record(UserId(1), player(2), &roster).unwrap();
        session.record(UserId(3), player(2), &roster).unwrap();
        let live: Vec<_> = roster.iter().filter(|p| p.user_id != UserId(2)).cloned().collect();

        // 2 leaves: their ballot slot goes away and ballots naming them
        // are cleared, so 1 and 3 must vote again.
        let outcome = session.remove_participant(UserId(2), &live);
        assert_eq!(outcome, VoteOutcome::Pending);
        let state = session.snapshot();
        assert_eq!(state.eligible_voters, ids(&[1, 3]));
        assert_eq!(state.candidates, ids(&[1, 3]));
        assert!(state.votes.values().all(Option::is_none));
    }

    #[test]
    fn test_remove_participant_completes_round() {
        let roster = villagers(3);
        let mut session = VoteSession::start(&ids(&[1, 2, 3]));
        session.record(UserId(1), VoteChoice::Abstain, &roster).unwrap();
        session.record(UserId(2), VoteChoice::Abstain, &roster).unwrap();

        let outcome = session.remove_participant(UserId(3), &roster[..2]);
        assert_eq!(
            outcome,
            VoteOutcome::Resolved(GameResult::without_execution(
                Winner::Werewolves,
                ResultReason::Abstain
            ))
        );
    }

    #[test]
    fn test_remove_participant_everyone_gone_forces_no_resolution() {
        let mut session = VoteSession::start(&ids(&[1]));
        let outcome = session.remove_participant(UserId(1), &[]);
        assert_eq!(outcome, VoteOutcome::Resolved(no_resolution()));
        let state = session.snapshot();
        assert!(state.history[0].top_choices.is_empty());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn tally_counts_every_eligible_voter_once(
                n in 1u64..8,
                ballots in proptest::collection::vec(0u64..9, 0..8),
            ) {
                let everyone = ids(&(1..=n).collect::<Vec<_>>());
                let roster = villagers(n);
                let mut session = VoteSession::start(&everyone);

                // Stop before the last voter so the round stays open.
                for (voter, pick) in (1..n).zip(ballots) {
                    let choice = if pick == 0 || pick > n { VoteChoice::Abstain } else { player(pick) };
                    let _ = session.record(UserId(voter), choice, &roster);
                }

                let state = session.snapshot();
                let tally = session.tally();
                let total: u32 = tally.counts.values().sum();
                prop_assert_eq!(total as usize, state.eligible_voters.len());
                for choice in tally.counts.keys() {
                    match choice.target() {
                        Some(target) => prop_assert!(state.candidates.contains(&target)),
                        None => prop_assert_eq!(*choice, VoteChoice::Abstain),
                    }
                }
                prop_assert_eq!(session.snapshot(), state);
            }
        }
    }
}
