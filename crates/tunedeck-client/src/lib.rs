//! Client-side synchronization layer for a remote tunedeck player.
//!
//! Everything that decides *what* the client shows lives in sans-IO types
//! (`ViewState` and its parts) that take the current `Instant` as input. The
//! async edges (`event_channel`, `remote`, `catalog::CatalogClient`) only move
//! bytes, and `session::Session` is the single loop that ties them together.

pub mod catalog;
pub mod display;
pub mod error;
pub mod event_channel;
pub mod paging;
pub mod remote;
pub mod seek;
pub mod selection;
pub mod session;
pub mod throttle;
pub mod view_state;

pub use error::ClientError;
pub use session::{Session, SessionHandle};
pub use view_state::{Effect, Intent, ViewSnapshot, ViewState};
