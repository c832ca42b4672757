//! Error types for the room layer.

use lycan_protocol::RoomId;
use lycan_session::SessionError;

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room does not exist.
    #[error("room {0} not found")]
    NotFound(RoomId),

    /// The room's command channel is closed.
    #[error("room {0} is unavailable")]
    Unavailable(RoomId),

    /// The registry refused the session.
    #[error(transparent)]
    Session(#[from] SessionError),
}
