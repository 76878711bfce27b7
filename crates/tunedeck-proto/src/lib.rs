//! Wire contracts shared between the tunedeck client and the remote player
//! service: catalog rows, the push-channel message, the player command
//! surface, plus client configuration.

pub mod catalog;
pub mod command;
pub mod config;
pub mod platform;
pub mod push;
pub mod track;

mod lenient;
