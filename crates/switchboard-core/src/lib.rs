//! Switchboard Core - Shared types, error kinds, and configuration
//!
//! This crate contains the foundational types used by the signaling relay.
//! It has no dependencies on networking code.

pub mod config;
pub mod error;
pub mod types;

pub use config::{Config, ConfigError, SignalConfig};
pub use error::*;
pub use types::*;

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 80;

/// Header carrying the session identifier on every non-creation request
pub const SESSION_ID_HEADER: &str = "session-id";
