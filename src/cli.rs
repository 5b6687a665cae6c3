//! Command-line surface.

use clap::{Parser, Subcommand};

use crate::color::ColorMode;

#[derive(Parser, Debug)]
#[command(
    name = "denv",
    version,
    about = "Launch, list and tear down per-project containerized dev environments."
)]
pub struct Cli {
    /// Colorize output: auto|always|never
    #[arg(long, value_enum, global = true)]
    pub color: Option<ColorMode>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CliCommand {
    /// Start a dev environment for a project directory (default: cwd)
    Start {
        /// Project directory
        path: Option<String>,

        /// Web port (default: first free port from the configured start)
        #[arg(long = "web-port", short = 'p')]
        web_port: Option<u16>,

        /// Dev server port (default: first free port from the configured start)
        #[arg(long = "dev-port")]
        dev_port: Option<u16>,

        /// Don't open the browser after start
        #[arg(long = "no-open", short = 'n')]
        no_open: bool,

        /// Follow container logs after start
        #[arg(long = "follow", short = 'f')]
        follow: bool,
    },

    /// Stop an instance by path, container name, or substring
    Kill {
        /// Project path, container name, or a unique substring of either
        target: Option<String>,

        /// Stop all running instances
        #[arg(long, short = 'a')]
        all: bool,

        /// Skip the confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
    },

    /// List instances
    #[command(alias = "ls")]
    List {
        /// Include stopped instances and keep their stale records
        #[arg(long, short = 'a')]
        all: bool,

        /// Only print container names
        #[arg(long, short = 'q')]
        quiet: bool,
    },

    /// Show or follow logs of an instance
    Logs {
        /// Project path, container name, or a unique substring of either
        target: String,

        /// Follow log output
        #[arg(long, short = 'f')]
        follow: bool,

        /// Number of trailing lines to show
        #[arg(long, default_value_t = 100)]
        tail: u32,
    },

    /// Run diagnostics against the environment and configuration
    Doctor,
}
