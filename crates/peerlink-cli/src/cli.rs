//! Command-line interface definitions and parsing

use std::time::Duration;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Print the final device list as JSON
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Advertise and scan at the same time, linking with every peer found
    Run {
        /// Stop after this many seconds (default: until Ctrl-C)
        #[arg(short, long)]
        duration: Option<u64>,
    },
    /// Only announce this device
    Advertise {
        /// Stop after this many seconds (default: until Ctrl-C)
        #[arg(short, long)]
        duration: Option<u64>,
    },
    /// Only scan for peers and link with them
    Scan {
        /// Stop after this many seconds (default: until Ctrl-C)
        #[arg(short, long)]
        duration: Option<u64>,
    },
    /// Print the effective configuration as TOML
    Config,
}

/// Which sessions a node command starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Both,
    AdvertiseOnly,
    ScanOnly,
}

impl Mode {
    pub fn advertises(&self) -> bool {
        matches!(self, Mode::Both | Mode::AdvertiseOnly)
    }

    pub fn scans(&self) -> bool {
        matches!(self, Mode::Both | Mode::ScanOnly)
    }
}

impl Commands {
    /// Session mode and run time, or `None` for commands that do not start a node
    pub fn session(&self) -> Option<(Mode, Option<Duration>)> {
        let (mode, duration) = match self {
            Commands::Run { duration } => (Mode::Both, *duration),
            Commands::Advertise { duration } => (Mode::AdvertiseOnly, *duration),
            Commands::Scan { duration } => (Mode::ScanOnly, *duration),
            Commands::Config => return None,
        };
        Some((mode, duration.map(Duration::from_secs)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_with_duration() {
        let cli = Cli::try_parse_from(["peerlink", "--verbose", "run", "--duration", "15"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(
            cli.command.session(),
            Some((Mode::Both, Some(Duration::from_secs(15))))
        );
    }

    #[test]
    fn test_parse_scan_until_interrupted() {
        let cli = Cli::try_parse_from(["peerlink", "scan", "-c", "node.toml"]).unwrap();
        assert_eq!(cli.config.as_deref(), Some("node.toml"));
        let (mode, duration) = cli.command.session().unwrap();
        assert!(mode.scans());
        assert!(!mode.advertises());
        assert_eq!(duration, None);
    }

    #[test]
    fn test_config_command_starts_no_session() {
        let cli = Cli::try_parse_from(["peerlink", "config"]).unwrap();
        assert_eq!(cli.command.session(), None);
    }
}
