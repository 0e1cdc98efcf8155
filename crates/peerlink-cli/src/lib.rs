//! PeerLink CLI library
//!
//! Building blocks of the `peerlink` binary: argument parsing, layered
//! configuration, console output and the node application.

pub mod app;
pub mod cli;
pub mod config;
pub mod display;
pub mod error;

pub use app::PeerlinkApp;
pub use cli::{Cli, Commands, Mode};
pub use config::AppConfig;
pub use error::{CliError, Result};
