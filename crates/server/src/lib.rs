//! `bookshelf_server`
//!
//! Serves the bookshelf store to network clients. Requests and replies are newline-delimited
//! JSON, see [`protocol`] and [`response`].

/// Environment-based configuration
pub mod config;
/// Error types
pub mod errors;
/// One handler per store operation, mapping outcomes onto replies
pub mod handlers;
/// TCP accept loop and per-connection request handling
pub mod listener;
pub mod protocol;
pub mod response;
/// Shared store state
pub mod state;

pub use config::ServerConfig;
pub use errors::ServerError;
pub use listener::BookshelfServer;
pub use state::AppState;
