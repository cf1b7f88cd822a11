//! HTTP surface: the messaging webhook, the JSON verifier and a health check.

pub mod server;
pub mod state;
pub mod twiml;

pub use {
    server::{build_app, start_server},
    state::AppState,
};
