//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand};

/// Arguments for running the HTTP server.
#[derive(Debug, Args)]
pub struct ServeCommand {
    /// Interface to bind (overrides `server.host`)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind (overrides `server.port`)
    #[arg(short, long)]
    pub port: Option<u16>,
}

/// Report inspection commands.
#[derive(Debug, Subcommand)]
pub enum ReportsCommand {
    /// List reports, newest first
    List {
        /// Only reports submitted by this user
        #[arg(short, long)]
        user: Option<String>,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show report counts grouped by exact coordinate
    Map {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// List reports inside a latitude/longitude box
    #[command(allow_negative_numbers = true)]
    Area {
        /// Southern edge
        min_lat: f64,
        /// Western edge
        min_lon: f64,
        /// Northern edge
        max_lat: f64,
        /// Eastern edge
        max_lon: f64,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        file: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_command_debug() {
        let cmd = StatusCommand { json: true };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("json"));
    }

    #[test]
    fn test_reports_command_debug() {
        let cmd = ReportsCommand::List {
            user: Some("u1".to_string()),
            json: false,
        };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("List"));
        assert!(debug_str.contains("u1"));
    }

    #[test]
    fn test_config_command_debug() {
        let cmd = ConfigCommand::Show { json: false };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("Show"));
    }
}
