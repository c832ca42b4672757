//! Game rules for lycan rooms.
//!
//! Pure, synchronous state: nothing here does I/O or knows about
//! sockets. The room coordinator feeds in the live roster and turns the
//! results into outbound messages.
//!
//! # Key types
//!
//! - [`GameState`]: phase machine, role quota, night tracking, vote
//! - [`VoteSession`]: multi-round majority vote with tie-break revotes
//! - [`deal`]: shuffled role assignment plus graveyard leftovers
//! - [`RoleDefinition`]: team and night ability of each role
//! - [`GameRules`]: per-room tunables

mod dealer;
mod engine;
mod error;
mod night;
mod roles;
mod rules;
mod vote;

pub use dealer::{Deal, deal, role_tokens, shuffle};
pub use engine::{Departure, GameState, NightOutcome};
pub use error::GameError;
pub use night::{NightEffect, NightProgress, NightTracker};
pub use roles::{NightAbility, RoleDefinition, definition, team_count};
pub use rules::GameRules;
pub use vote::{Tally, VoteOutcome, VoteSession, VoteUpdate};
