//! Xtream catalog cache and live session controller
//!
//! Mirrors an Xtream Codes provider's catalog into a local SQLite store,
//! derives the browsable channel lists from it and drives playback and
//! picture-in-picture for the live session.

pub mod api;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod pip;
pub mod player;
pub mod published;
pub mod session;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;

pub use cache::{CatalogCache, StartupDecision};
pub use error::{CatalogError, Result};
pub use session::{AccountService, ChannelSession};
