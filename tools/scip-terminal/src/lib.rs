//! # SCiPnet Terminal
//!
//! Interactive client for the SCiPnet server.
//!
//! ```text
//! scip-terminal/
//! ├── client.rs   # TerminalClient: probe, login, access, logout
//! ├── command.rs  # ACCESS / HELP / CLEAR / LOGOUT parsing
//! └── render.rs   # plain-text summaries of replies
//! ```

#![warn(clippy::all)]

pub mod client;
pub mod command;
pub mod render;

pub use client::{ClientError, TerminalClient};
pub use command::{Command, CommandError, HELP_TEXT};
