//! CLI: serve the API, sign in from the terminal, print monthly summaries.
//!
//! This crate provides the `tasktime` command-line interface.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod loopback;
pub mod secret;

pub use cli::Cli;
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
