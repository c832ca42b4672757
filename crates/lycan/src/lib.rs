//! # lycan
//!
//! Authoritative room server for werewolf-style party games.
//!
//! Clients connect over WebSocket, send a `hello` naming a room, and then
//! exchange JSON commands and messages with that room's coordinator. The
//! server ties the layers together: transport → protocol → session →
//! game → room.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lycan::prelude::*;
//!
//! # async fn start() -> Result<(), LycanError> {
//! let server = LycanServer::builder()
//!     .config(ServerConfig::load())
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::ServerConfig;
pub use error::LycanError;
pub use server::{LycanServer, LycanServerBuilder};

pub mod prelude {
    pub use crate::{LycanError, LycanServer, LycanServerBuilder, ServerConfig};
    pub use lycan_protocol::{
        ClientCommand, Envelope, Hello, PROTOCOL_VERSION, Phase, RoleId, RoleQuota, RoomId,
        ServerMessage, UserId,
    };
    pub use lycan_room::RoomConfig;
}
