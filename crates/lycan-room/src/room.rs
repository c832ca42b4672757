//! Room actor: an isolated Tokio task that owns one room's state.
//!
//! Each room runs in its own task and talks to connection handlers
//! through an mpsc channel. Commands are handled one at a time, start to
//! finish, so the registry and game state need no locking.

use lycan_game::GameState;
use lycan_protocol::{
    ClientCommand, JsonCodec, Participant, Phase, RoomId, ServerMessage, SystemMessage,
    UserId,
};
use lycan_session::{Broadcaster, OutboundSender, Session, SessionId, SessionRegistry};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::{mpsc, oneshot};

use crate::{RoomConfig, RoomError};

/// Commands sent to a room actor through its channel.
///
/// Variants carrying a `oneshot::Sender` are request/reply; the rest are
/// fire-and-forget.
pub(crate) enum RoomCommand {
    /// Register a connected participant.
    Join {
        session_id: SessionId,
        user_id: UserId,
        user_name: String,
        outbound: OutboundSender,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    /// Remove a participant. Replies with how many remain.
    Leave {
        session_id: SessionId,
        reply: oneshot::Sender<usize>,
    },

    /// A decoded client command.
    Command {
        session_id: SessionId,
        command: ClientCommand,
    },

    /// Request room metadata.
    GetInfo { reply: oneshot::Sender<RoomInfo> },

    /// Stop the actor.
    Shutdown,
}

/// A snapshot of room metadata (not the game state itself).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomInfo {
    pub room_id: RoomId,
    pub phase: Phase,
    pub participant_count: usize,
    pub host: Option<UserId>,
    pub can_start_game: bool,
}

/// Handle to a running room actor.
///
/// Cheap to clone. Connection handlers keep one for the lifetime of the
/// connection so commands skip the manager lock.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    room_id: RoomId,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// Asks the room to register a participant.
    ///
    /// The newcomer's outbound queue receives the initial state sync
    /// before this returns.
    pub async fn join(
        &self,
        session_id: SessionId,
        user_id: UserId,
        user_name: String,
        outbound: OutboundSender,
    ) -> Result<(), RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.request(RoomCommand::Join {
            session_id,
            user_id,
            user_name,
            outbound,
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| self.unavailable())?
    }

    /// Removes a participant and returns how many remain.
    pub async fn leave(&self, session_id: SessionId) -> Result<usize, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.request(RoomCommand::Leave {
            session_id,
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| self.unavailable())
    }

    /// Forwards a client command (fire-and-forget).
    pub async fn send_command(
        &self,
        session_id: SessionId,
        command: ClientCommand,
    ) -> Result<(), RoomError> {
        self.request(RoomCommand::Command {
            session_id,
            command,
        })
        .await
    }

    /// Requests the current room info.
    pub async fn get_info(&self) -> Result<RoomInfo, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.request(RoomCommand::GetInfo { reply: reply_tx }).await?;
        reply_rx.await.map_err(|_| self.unavailable())
    }

    /// Tells the room to shut down.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.request(RoomCommand::Shutdown).await
    }

    async fn request(&self, command: RoomCommand) -> Result<(), RoomError> {
        self.sender
            .send(command)
            .await
            .map_err(|_| self.unavailable())
    }

    fn unavailable(&self) -> RoomError {
        RoomError::Unavailable(self.room_id.clone())
    }
}

/// The room coordinator. Runs inside its own Tokio task.
pub(crate) struct RoomActor {
    pub(crate) room_id: RoomId,
    pub(crate) registry: SessionRegistry,
    pub(crate) fanout: Broadcaster<JsonCodec>,
    pub(crate) game: GameState,
    pub(crate) rng: StdRng,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl RoomActor {
    /// Runs the actor loop until shutdown or until every handle is gone.
    async fn run(mut self) {
        tracing::info!(room = %self.room_id, "room actor started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                RoomCommand::Join {
                    session_id,
                    user_id,
                    user_name,
                    outbound,
                    reply,
                } => {
                    let session = Session::new(session_id, user_id, user_name, outbound);
                    let _ = reply.send(self.handle_join(session));
                }
                RoomCommand::Leave { session_id, reply } => {
                    let _ = reply.send(self.handle_leave(session_id));
                }
                RoomCommand::Command {
                    session_id,
                    command,
                } => self.handle_command(session_id, command),
                RoomCommand::GetInfo { reply } => {
                    let _ = reply.send(self.info());
                }
                RoomCommand::Shutdown => {
                    tracing::info!(room = %self.room_id, "room shutting down");
                    break;
                }
            }
        }

        tracing::info!(room = %self.room_id, "room actor stopped");
    }

    fn handle_join(&mut self, session: Session) -> Result<(), RoomError> {
        let session_id = session.id;
        let user_id = session.user_id;
        let user_name = session.user_name.clone();
        self.registry.add(session)?;

        tracing::info!(
            room = %self.room_id,
            %session_id,
            %user_id,
            participants = self.registry.count(),
            "participant joined"
        );

        self.fanout.broadcast_except(
            &self.registry,
            ServerMessage::Join {
                user_id,
                user_name,
                participants: self.public_participants(),
            },
            session_id,
        );
        self.fanout.send_to(
            &self.registry,
            session_id,
            ServerMessage::System(self.sync_for(user_id)),
        );
        if self.game.phase() == Phase::Waiting {
            self.broadcast_role_config();
        }
        Ok(())
    }

    fn handle_leave(&mut self, session_id: SessionId) -> usize {
        let Some(session) = self.registry.remove(session_id) else {
            tracing::debug!(room = %self.room_id, %session_id, "leave for unknown session");
            return self.registry.count();
        };

        tracing::info!(
            room = %self.room_id,
            %session_id,
            user_id = %session.user_id,
            participants = self.registry.count(),
            "participant left"
        );

        self.fanout.broadcast(
            &self.registry,
            ServerMessage::Leave {
                user_id: session.user_id,
                user_name: session.user_name,
                participants: self.public_participants(),
            },
        );
        self.after_departure(session.user_id);
        self.registry.count()
    }

    /// Participants as everyone may see them: roles stay hidden until the
    /// game is finished.
    pub(crate) fn public_participants(&self) -> Vec<Participant> {
        let participants = self.registry.list_participants();
        if self.game.phase() == Phase::Finished {
            participants
        } else {
            participants.iter().map(Participant::redacted).collect()
        }
    }

    /// The initial state sync for one participant.
    fn sync_for(&self, user_id: UserId) -> SystemMessage {
        let session = self.registry.find_by_user_id(user_id);
        SystemMessage {
            message: "Connected to room".to_owned(),
            self_id: Some(user_id),
            is_host: Some(self.registry.is_host(user_id)),
            participants: Some(self.public_participants()),
            phase: Some(self.game.phase()),
            role_config: Some(self.game.quota().clone()),
            can_start_game: Some(self.game.can_start(self.registry.count())),
            vote_state: self.game.vote_state(),
            result: self.game.result().cloned(),
            role: session.and_then(|s| s.role),
        }
    }

    fn info(&self) -> RoomInfo {
        RoomInfo {
            room_id: self.room_id.clone(),
            phase: self.game.phase(),
            participant_count: self.registry.count(),
            host: self.registry.host().map(|s| s.user_id),
            can_start_game: self.game.can_start(self.registry.count()),
        }
    }
}

/// Spawns a room actor seeded from the OS and returns its handle.
pub fn spawn_room(room_id: RoomId, config: &RoomConfig) -> RoomHandle {
    spawn_room_with_rng(room_id, config, StdRng::from_os_rng())
}

/// Spawns a room actor that deals roles from `rng`.
///
/// `config.command_buffer` bounds the channel: senders wait when the
/// room falls behind.
pub fn spawn_room_with_rng(room_id: RoomId, config: &RoomConfig, rng: StdRng) -> RoomHandle {
    let (tx, rx) = mpsc::channel(config.command_buffer.max(1));

    let actor = RoomActor {
        room_id: room_id.clone(),
        registry: SessionRegistry::new(),
        fanout: Broadcaster::new(JsonCodec),
        game: GameState::new(config.rules()),
        rng,
        receiver: rx,
    };

    tokio::spawn(actor.run());

    RoomHandle { room_id, sender: tx }
}
