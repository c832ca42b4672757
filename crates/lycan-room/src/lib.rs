//! Room coordination for lycan.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns its
//! session registry, fan-out and game state. Commands are processed one
//! at a time to completion, so nothing inside a room needs a lock.
//!
//! # Key types
//!
//! - [`RoomManager`]: creates rooms on first join, destroys them when empty
//! - [`RoomHandle`]: send commands to a running room actor
//! - [`RoomConfig`]: per-room settings

mod config;
mod dispatcher;
mod error;
mod manager;
mod room;

pub use config::RoomConfig;
pub use error::RoomError;
pub use manager::RoomManager;
pub use room::{RoomHandle, RoomInfo, spawn_room, spawn_room_with_rng};
