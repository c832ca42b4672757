//! Session types: one record per connected participant.
//!
//! A session ties together:
//! - WHICH connection it is (`SessionId`)
//! - WHO is behind it (`UserId`, display name)
//! - WHAT they hold in the game (host flag, dealt role)
//! - HOW to reach them (an owned outbound channel to their socket task)

use std::fmt;

use lycan_protocol::{Participant, RoleId, UserId};
use tokio::sync::mpsc;

use crate::SessionError;

/// Opaque key of a session within a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S-{}", self.0)
    }
}

/// Sending half of a session's outbound queue of serialized frames.
pub type OutboundSender = mpsc::UnboundedSender<String>;

/// Receiving half, drained by the connection's writer.
pub type OutboundReceiver = mpsc::UnboundedReceiver<String>;

/// Creates a fresh outbound queue for a new connection.
pub fn outbound_channel() -> (OutboundSender, OutboundReceiver) {
    mpsc::unbounded_channel()
}

/// A connected participant as the room sees them.
#[derive(Debug, Clone)]
pub struct Session {
    /// Key of this session in the registry.
    pub id: SessionId,

    /// Participant identity.
    pub user_id: UserId,

    /// Display name.
    pub user_name: String,

    /// Set by the registry for exactly one session per room.
    pub is_host: bool,

    /// Dealt role, `None` until the night phase first starts.
    pub role: Option<RoleId>,

    outbound: OutboundSender,
}

impl Session {
    /// Creates a session that is not yet host and has no role.
    pub fn new(
        id: SessionId,
        user_id: UserId,
        user_name: impl Into<String>,
        outbound: OutboundSender,
    ) -> Self {
        Self {
            id,
            user_id,
            user_name: user_name.into(),
            is_host: false,
            role: None,
            outbound,
        }
    }

    /// Public projection sent to clients.
    pub fn participant(&self) -> Participant {
        Participant {
            user_id: self.user_id,
            user_name: self.user_name.clone(),
            is_host: self.is_host,
            role: self.role,
        }
    }

    /// Queues one serialized frame for this session's socket.
    ///
    /// # Errors
    /// [`SessionError::DeliveryFailed`] if the socket task has gone away.
    pub fn deliver(&self, frame: String) -> Result<(), SessionError> {
        self.outbound
            .send(frame)
            .map_err(|_| SessionError::DeliveryFailed(self.id))
    }
}
