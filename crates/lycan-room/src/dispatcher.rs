//! Command dispatch: validates each client command, applies it to the
//! game and registry, and emits the resulting messages.
//!
//! Every rejection becomes a private `system` notice to the requester;
//! none of them change state.

use lycan_game::{Departure, GameError, VoteOutcome, VoteUpdate};
use lycan_protocol::{
    ClientCommand, NightTarget, Phase, RoleQuota, ServerMessage, SystemMessage, UserId,
    VoteChoice,
};
use lycan_session::SessionId;

use crate::room::RoomActor;

/// Sender id of server-authored chat messages. Real users start at 1.
const NARRATOR_ID: UserId = UserId(0);
const NARRATOR_NAME: &str = "Narrator";

impl RoomActor {
    pub(crate) fn handle_command(&mut self, session_id: SessionId, command: ClientCommand) {
        let Some(session) = self.registry.find_by_connection(session_id) else {
            tracing::debug!(room = %self.room_id, %session_id, "command from unknown session");
            return;
        };
        let user_id = session.user_id;
        let user_name = session.user_name.clone();

        let outcome = match command {
            ClientCommand::UpdateRoleConfig { role_config } => {
                self.update_role_config(user_id, role_config)
            }
            ClientCommand::ChangePhase { phase } => self.change_phase(user_id, phase),
            ClientCommand::CastVote { choice } => self.cast_vote(user_id, choice),
            ClientCommand::NightAction { target } => self.night_action(user_id, target),
            ClientCommand::Message { message } => {
                self.chat(user_id, user_name, message);
                Ok(())
            }
            ClientCommand::Ping => Ok(()),
        };

        if let Err(e) = outcome {
            tracing::debug!(room = %self.room_id, %user_id, error = %e, "command rejected");
            self.fanout.send_to(
                &self.registry,
                session_id,
                ServerMessage::System(SystemMessage::notice(e.to_string())),
            );
        }
    }

    fn require_host(&self, user_id: UserId) -> Result<(), GameError> {
        if self.registry.is_host(user_id) {
            Ok(())
        } else {
            Err(GameError::NotHost)
        }
    }

    fn update_role_config(&mut self, user_id: UserId, quota: RoleQuota) -> Result<(), GameError> {
        self.require_host(user_id)?;
        self.game.update_quota(quota)?;
        self.broadcast_role_config();
        Ok(())
    }

    pub(crate) fn broadcast_role_config(&self) {
        self.fanout.broadcast(
            &self.registry,
            ServerMessage::RoleConfigUpdate {
                role_config: self.game.quota().clone(),
                can_start_game: self.game.can_start(self.registry.count()),
            },
        );
    }

    fn change_phase(&mut self, user_id: UserId, to: Phase) -> Result<(), GameError> {
        self.require_host(user_id)?;

        // The deal covers everyone present; later phases only involve
        // those who were dealt in.
        let participants = if to == Phase::Night {
            self.registry.user_ids()
        } else {
            self.registry.player_ids()
        };
        let dealt = self.game.change_phase(to, &participants, &mut self.rng)?;

        if to == Phase::Waiting {
            self.registry.clear_roles();
        }
        if let Some(dealt) = dealt {
            for (user_id, role) in dealt.assignment {
                self.registry.set_role(user_id, role);
                self.fanout
                    .send_to_user(&self.registry, user_id, ServerMessage::RoleAssigned { role });
            }
            tracing::info!(
                room = %self.room_id,
                graveyard = dealt.graveyard.len(),
                "roles dealt"
            );
        }

        tracing::info!(room = %self.room_id, phase = %to, "phase changed");
        self.fanout.broadcast(
            &self.registry,
            ServerMessage::PhaseChange {
                phase: to,
                result: None,
            },
        );

        if let Some(vote_state) = self.game.vote_state().filter(|_| to == Phase::Vote) {
            self.fanout
                .broadcast(&self.registry, ServerMessage::Vote { vote_state });
        }
        Ok(())
    }

    fn cast_vote(&mut self, user_id: UserId, choice: VoteChoice) -> Result<(), GameError> {
        let roster = self.registry.list_participants();
        let update = self.game.record_vote(user_id, choice, &roster)?;
        self.publish_vote(update);
        Ok(())
    }

    /// Broadcasts a vote snapshot and, on resolution, moves to `finished`
    /// and announces the result.
    fn publish_vote(&mut self, update: VoteUpdate) {
        self.fanout.broadcast(
            &self.registry,
            ServerMessage::Vote {
                vote_state: update.state,
            },
        );

        match update.outcome {
            VoteOutcome::Pending => {}
            VoteOutcome::Revote => {
                tracing::info!(room = %self.room_id, "vote tied, revote");
            }
            VoteOutcome::Resolved(result) => {
                self.game.set_phase(Phase::Finished, &self.registry.user_ids());
                tracing::info!(
                    room = %self.room_id,
                    winner = ?result.winner_team,
                    reason = ?result.reason,
                    "game finished"
                );
                self.fanout.broadcast(
                    &self.registry,
                    ServerMessage::PhaseChange {
                        phase: Phase::Finished,
                        result: Some(result),
                    },
                );
            }
        }
    }

    fn night_action(
        &mut self,
        user_id: UserId,
        target: Option<NightTarget>,
    ) -> Result<(), GameError> {
        let roster = self.registry.list_participants();
        let outcome = self.game.night_action(user_id, target, &roster)?;

        if let Some(text) = outcome.effect.describe() {
            self.fanout.broadcast(
                &self.registry,
                ServerMessage::Message {
                    user_id: NARRATOR_ID,
                    user_name: NARRATOR_NAME.to_owned(),
                    message: text,
                    private: true,
                    recipient_id: Some(user_id),
                },
            );
        }
        self.fanout.send_to_user(
            &self.registry,
            user_id,
            ServerMessage::Action {
                completed: true,
                remaining: outcome.progress.remaining,
            },
        );

        if outcome.progress.all_completed {
            self.advance_to_day();
        }
        Ok(())
    }

    fn advance_to_day(&mut self) {
        self.game.set_phase(Phase::Day, &self.registry.user_ids());
        tracing::info!(room = %self.room_id, "night complete, day begins");
        self.fanout.broadcast(
            &self.registry,
            ServerMessage::PhaseChange {
                phase: Phase::Day,
                result: None,
            },
        );
    }

    fn chat(&self, user_id: UserId, user_name: String, message: String) {
        self.fanout.broadcast(
            &self.registry,
            ServerMessage::Message {
                user_id,
                user_name,
                message,
                private: false,
                recipient_id: None,
            },
        );
    }

    /// Re-derives night and vote progress after `user_id` left.
    pub(crate) fn after_departure(&mut self, user_id: UserId) {
        let roster = self.registry.list_participants();
        match self.game.handle_departure(user_id, &roster) {
            Departure::Night(progress) if progress.all_completed => self.advance_to_day(),
            Departure::Vote(update) => self.publish_vote(update),
            Departure::Night(_) | Departure::Nothing => {}
        }
        if self.game.phase() == Phase::Waiting {
            self.broadcast_role_config();
        }
    }
}
