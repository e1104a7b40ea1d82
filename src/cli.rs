// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "cutover")]
#[command(about = "Release deployment with atomic cutover and automatic rollback")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a cutover.yml configuration file
    Init {
        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },

    /// Deploy the configured revision
    Deploy {
        /// Deploy a different revision than the configured one
        #[arg(long)]
        revision: Option<String>,

        /// Break a live deploy lock
        #[arg(long)]
        force_lock: bool,
    },

    /// Switch current back to the previous release
    Rollback {
        /// Break a live deploy lock
        #[arg(long)]
        force_lock: bool,
    },

    /// Show the live release and on-disk releases
    Status,
}
