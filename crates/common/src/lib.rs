//! Shared message types and error helpers used across the claimguard crates.

pub mod error;
pub mod types;

pub use {
    error::FromMessage,
    types::{InboundMessage, MediaRef},
};
