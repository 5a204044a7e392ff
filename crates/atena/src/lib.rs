//! Atena in the terminal.
//!
//! The crate ships a CLI for chatting with an Atena server from the
//! terminal. The pieces it is made of (command parsing and configuration
//! from the environment) are exposed for host apps embedding the client.

#![deny(missing_docs)]

pub mod commands;
pub mod config;

pub use commands::{Command, ParseError};
pub use config::{Config, ConfigError};

/// Re-exports of [`atena_core`] crate.
pub mod core {
    pub use atena_core::*;
}
