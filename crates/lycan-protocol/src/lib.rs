//! Wire protocol for lycan.
//!
//! Defines what clients and the room server say to each other:
//!
//! - **Types** ([`ClientCommand`], [`ServerMessage`], [`Envelope`],
//!   [`VoteState`], [`GameResult`], ...): the JSON shapes on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): text frame conversion.
//! - **Errors** ([`ProtocolError`]).
//!
//! ```text
//! Transport (text) → Protocol (ClientCommand) → Room (game rules)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    ClientCommand, Envelope, GameResult, Hello, NightTarget, Participant,
    Phase, ResultReason, RoleId, RoleQuota, RoomId, ServerMessage,
    SystemMessage, Team, UserId, VoteChoice, VoteCount, VoteRoundSummary,
    VoteState, VoteStatus, Winner,
};

/// The protocol version clients must announce in their [`Hello`].
pub const PROTOCOL_VERSION: u32 = 1;
