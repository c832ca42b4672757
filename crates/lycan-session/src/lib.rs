//! Session tracking for one room.
//!
//! 1. **Registry**: who is connected, in join order, who hosts, and
//!    which role each participant holds ([`SessionRegistry`]).
//! 2. **Fan-out**: serializing outbound messages once and delivering
//!    them to one or all sessions ([`Broadcaster`]).
//!
//! ```text
//! Room coordinator (above)  ← owns one registry per room
//!     ↕
//! Session layer (this crate)
//!     ↕
//! Protocol layer (below)    ← UserId, Participant, ServerMessage
//! ```

mod error;
mod fanout;
mod registry;
mod session;

pub use error::SessionError;
pub use fanout::Broadcaster;
pub use registry::SessionRegistry;
pub use session::{OutboundReceiver, OutboundSender, Session, SessionId, outbound_channel};
