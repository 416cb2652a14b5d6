use std::path::PathBuf;

use clap::{Parser, Subcommand};

use ra_bootstrap::session::CommandId;

#[derive(Parser, Debug)]
#[command(version, about = "rust-analyzer server bootstrap and update manager")]
pub struct Args {
    /// Path to configuration file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Answer yes to every download prompt
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Log at debug level
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Sub‑commands (run, server, etc.)
    #[command(subcommand)]
    pub sub: Option<Cmd>,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Full startup: nightly check, server resolution, probe (default)
    Run,
    /// Resolve (and if needed download) the server only
    Server,
    /// Activate, then run a registered command
    Exec {
        #[arg(value_enum)]
        command: CommandId,
    },
    /// Print the persisted installation state
    State,
    /// Print the repository root containing PATH (default: current dir)
    Root {
        path: Option<PathBuf>,

        /// Marker file or directory (repeatable, default .git)
        #[arg(long, short = 'm')]
        marker: Vec<String>,
    },
}
