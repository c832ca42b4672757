//! Broadcast fan-out: serialize once, deliver to many.
//!
//! Delivery is best-effort per recipient. A closed channel is logged and
//! skipped; it never stops delivery to the others and never fails the
//! caller's state transition.
//!
//! Private scoping is enforced here and nowhere else: a message that
//! reports a [`ServerMessage::private_recipient`] only ever reaches that
//! participant, whichever method it was handed to.

use lycan_protocol::{Codec, Envelope, ServerMessage, UserId};

use crate::{SessionId, SessionRegistry};

/// Delivers stamped, encoded messages to a room's sessions.
#[derive(Debug, Clone, Default)]
pub struct Broadcaster<C: Codec> {
    codec: C,
}

impl<C: Codec> Broadcaster<C> {
    /// Creates a broadcaster using the given codec.
    pub fn new(codec: C) -> Self {
        Self { codec }
    }

    /// Sends to every session (or only the private recipient).
    ///
    /// Returns the number of sessions the frame was queued for.
    pub fn broadcast(
        &self,
        registry: &SessionRegistry,
        message: ServerMessage,
    ) -> usize {
        self.fan_out(registry, message, |_| true)
    }

    /// Sends to every session except `excluded`.
    pub fn broadcast_except(
        &self,
        registry: &SessionRegistry,
        message: ServerMessage,
        excluded: SessionId,
    ) -> usize {
        self.fan_out(registry, message, |sid| sid != excluded)
    }

    /// Sends to one session.
    pub fn send_to(
        &self,
        registry: &SessionRegistry,
        session_id: SessionId,
        message: ServerMessage,
    ) -> usize {
        self.fan_out(registry, message, |sid| sid == session_id)
    }

    /// Sends to the session of one participant.
    pub fn send_to_user(
        &self,
        registry: &SessionRegistry,
        user_id: UserId,
        message: ServerMessage,
    ) -> usize {
        match registry.find_by_user_id(user_id) {
            Some(session) => self.send_to(registry, session.id, message),
            None => {
                tracing::debug!(%user_id, "no session for recipient, dropping");
                0
            }
        }
    }

    fn fan_out(
        &self,
        registry: &SessionRegistry,
        message: ServerMessage,
        wanted: impl Fn(SessionId) -> bool,
    ) -> usize {
        let private_to = message.private_recipient();

        let frame = match self.codec.encode(&Envelope::now(message)) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode outbound message");
                return 0;
            }
        };

        let mut delivered = 0;
        for session in registry.iter() {
            if !wanted(session.id) {
                continue;
            }
            if let Some(recipient) = private_to {
                if recipient != Some(session.user_id) {
                    continue;
                }
            }
            match session.deliver(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::warn!(
                        session_id = %session.id,
                        error = %e,
                        "dropping frame for closed session"
                    );
                }
            }
        }
        delivered
    }
}

// =========================================================================
// Tests
// =========================================================================
