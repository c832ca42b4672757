//! Unified error type for the lycan server.

use lycan_protocol::ProtocolError;
use lycan_room::RoomError;
use lycan_session::SessionError;
use lycan_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates the `From` impl, so
/// `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum LycanError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, bad handshake).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (duplicate session, delivery).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A room-level error (room gone).
    #[error(transparent)]
    Room(#[from] RoomError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use lycan_protocol::RoomId;
    use lycan_session::SessionId;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let lycan_err: LycanError = err.into();
        assert!(matches!(lycan_err, LycanError::Transport(_)));
        assert!(lycan_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidMessage("bad".into());
        let lycan_err: LycanError = err.into();
        assert!(matches!(lycan_err, LycanError::Protocol(_)));
    }

    #[test]
    fn test_from_session_error() {
        let err = SessionError::AlreadyRegistered(SessionId(3));
        let lycan_err: LycanError = err.into();
        assert!(matches!(lycan_err, LycanError::Session(_)));
    }

    #[test]
    fn test_from_room_error() {
        let err = RoomError::NotFound(RoomId::new("attic"));
        let lycan_err: LycanError = err.into();
        assert!(matches!(lycan_err, LycanError::Room(_)));
        assert!(lycan_err.to_string().contains("attic"));
    }
}
