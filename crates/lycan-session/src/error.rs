//! Error types for the session layer.

use crate::SessionId;

/// Errors that can occur while tracking or messaging sessions.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A session with this id is already registered in the room.
    #[error("session {0} is already registered")]
    AlreadyRegistered(SessionId),

    /// The session's outbound channel is closed (its connection is gone).
    #[error("delivery to session {0} failed")]
    DeliveryFailed(SessionId),
}
