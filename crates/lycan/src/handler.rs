//! Per-connection handler: hello handshake, room join, and frame routing.
//!
//! Each accepted connection gets its own Tokio task running this handler:
//!   1. Receive `hello` → validate version and room name
//!   2. Join (or create) the room → the room sends the state sync
//!   3. Loop: forward room frames out, decode client commands in

use std::sync::Arc;

use lycan_protocol::{
    ClientCommand, Codec, Envelope, Hello, PROTOCOL_VERSION, ProtocolError, RoomId,
    ServerMessage, SystemMessage,
};
use lycan_session::{SessionId, outbound_channel};
use lycan_transport::{Connection, WebSocketConnection};
use tokio::time::Instant;

use crate::LycanError;
use crate::server::ServerState;

/// Removes the session from its room when the handler exits, however it
/// exits. `Drop` is synchronous, so the leave runs on a spawned task.
struct RoomGuard {
    room_id: RoomId,
    session_id: SessionId,
    state: Arc<ServerState>,
}

impl Drop for RoomGuard {
    fn drop(&mut self) {
        let room_id = self.room_id.clone();
        let session_id = self.session_id;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            let mut rooms = state.rooms.lock().await;
            if let Err(e) = rooms.leave(&room_id, session_id).await {
                tracing::debug!(room = %room_id, %session_id, error = %e, "leave failed");
            }
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection(
    conn: WebSocketConnection,
    state: Arc<ServerState>,
) -> Result<(), LycanError> {
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    let hello = match perform_handshake(&conn, &state).await {
        Ok(hello) => hello,
        Err(e) => {
            let _ = conn.close().await;
            return Err(e);
        }
    };

    let session_id = SessionId(conn_id.into_inner());
    let user_id = state.allocate_user_id();
    let user_name = match hello.user_name.trim() {
        "" => format!("User-{}", user_id.0),
        name => name.to_string(),
    };
    let room_id = hello.room;

    let (outbound, mut inbox) = outbound_channel();
    let handle = {
        let mut rooms = state.rooms.lock().await;
        rooms
            .join_or_create(room_id.clone(), session_id, user_id, user_name, outbound)
            .await?
    };
    let _guard = RoomGuard {
        room_id: room_id.clone(),
        session_id,
        state: Arc::clone(&state),
    };
    tracing::info!(%conn_id, %user_id, room = %room_id, "participant joined");

    let idle = state.config.idle_timeout();
    let mut deadline = Instant::now() + idle.unwrap_or_default();

    loop {
        tokio::select! {
            frame = inbox.recv() => {
                let Some(frame) = frame else {
                    tracing::debug!(%user_id, "room closed the session");
                    break;
                };
                if let Err(e) = conn.send(&frame).await {
                    tracing::debug!(%user_id, error = %e, "send failed");
                    break;
                }
            }
            incoming = conn.recv() => {
                let data = match incoming {
                    Ok(Some(data)) => data,
                    Ok(None) => {
                        tracing::info!(%user_id, "connection closed cleanly");
                        break;
                    }
                    Err(e) => {
                        tracing::debug!(%user_id, error = %e, "recv error");
                        break;
                    }
                };
                if let Some(idle) = idle {
                    deadline = Instant::now() + idle;
                }

                let command: ClientCommand = match state.codec.decode(&data) {
                    Ok(command) => command,
                    Err(e) => {
                        tracing::debug!(%user_id, error = %e, "dropping undecodable frame");
                        continue;
                    }
                };
                if let Err(e) = handle.send_command(session_id, command).await {
                    tracing::debug!(%user_id, error = %e, "room unavailable");
                    break;
                }
            }
            _ = tokio::time::sleep_until(deadline), if idle.is_some() => {
                tracing::info!(%user_id, "connection idle, closing");
                break;
            }
        }
    }

    let _ = conn.close().await;
    // _guard drops here → leave fires.
    Ok(())
}

/// Receives and validates the `hello` frame.
///
/// Every rejection is reported to the client with a system notice before
/// the error is returned.
async fn perform_handshake(
    conn: &WebSocketConnection,
    state: &ServerState,
) -> Result<Hello, LycanError> {
    let data = match tokio::time::timeout(state.config.handshake_timeout(), conn.recv()).await {
        Ok(Ok(Some(data))) => data,
        Ok(Ok(None)) => {
            return Err(invalid("connection closed before hello"));
        }
        Ok(Err(e)) => return Err(LycanError::Transport(e)),
        Err(_) => {
            send_notice(conn, state, "handshake timed out").await?;
            return Err(invalid("handshake timed out"));
        }
    };

    let hello: Hello = match state.codec.decode(&data) {
        Ok(hello) => hello,
        Err(_) => {
            send_notice(conn, state, "expected hello").await?;
            return Err(invalid("first frame must be hello"));
        }
    };

    if hello.version != PROTOCOL_VERSION {
        let message = format!(
            "version mismatch: expected {PROTOCOL_VERSION}, got {}",
            hello.version
        );
        send_notice(conn, state, &message).await?;
        return Err(invalid("protocol version mismatch"));
    }

    if hello.room.as_str().trim().is_empty() {
        send_notice(conn, state, "room name required").await?;
        return Err(invalid("empty room name"));
    }

    Ok(hello)
}

/// Sends a system notice straight to the socket.
async fn send_notice(
    conn: &WebSocketConnection,
    state: &ServerState,
    message: &str,
) -> Result<(), LycanError> {
    let envelope = Envelope::now(ServerMessage::System(SystemMessage::notice(message)));
    let frame = state.codec.encode(&envelope)?;
    conn.send(&frame).await?;
    Ok(())
}

fn invalid(reason: &str) -> LycanError {
    LycanError::Protocol(ProtocolError::InvalidMessage(reason.to_string()))
}
