// ABOUTME: Entry point for the cutover CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use cutover::collab::Collaborators;
use cutover::config::{self, Config};
use cutover::deploy::Deployer;
use cutover::error::{Error, Result};
use cutover::hooks::HookRegistry;
use cutover::host::{CommandNotifier, GitSource, KeepLatest, SystemHost, VersionManagerCli};
use cutover::types::Revision;
use std::env;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let result = run(cli).await;

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let cwd = env::current_dir()?;

    match cli.command {
        Commands::Init { force } => config::init_config(&cwd, force),
        Commands::Deploy {
            revision,
            force_lock,
        } => {
            let mut config = Config::discover(&cwd)?;
            if let Some(rev) = revision {
                config.revision =
                    Revision::new(&rev).map_err(|e| Error::InvalidConfig(e.to_string()))?;
            }

            let collab = build_collaborators(&config);
            let hooks = HookRegistry::from_scripts(&config.hooks);
            let deployer = Deployer::new(&config, &collab, &hooks);

            let outcome = deployer.deploy(force_lock).await?;
            println!("{}", outcome.describe());
            Ok(())
        }
        Commands::Rollback { force_lock } => {
            let config = Config::discover(&cwd)?;
            let collab = build_collaborators(&config);
            let hooks = HookRegistry::new();
            let deployer = Deployer::new(&config, &collab, &hooks);

            let release = deployer.rollback(force_lock).await?;
            println!("current is now {}", release.display());
            Ok(())
        }
        Commands::Status => {
            let config = Config::discover(&cwd)?;
            let collab = build_collaborators(&config);
            let hooks = HookRegistry::new();
            let deployer = Deployer::new(&config, &collab, &hooks);

            let status = deployer.status()?;
            match &status.current {
                Some(release) => println!("current: {}", release.display()),
                None => println!("current: (none)"),
            }
            if let Some(recorded) = &status.recorded {
                println!("runtime: {recorded}");
            }
            println!("releases: {}", status.releases.len());
            for release in &status.releases {
                println!("  {}", release.display());
            }
            Ok(())
        }
    }
}

fn build_collaborators(config: &Config) -> Collaborators {
    Collaborators {
        source: Box::new(GitSource::new()),
        runtime: Box::new(VersionManagerCli::new(
            &config.version_manager,
            &config.runtime_root,
        )),
        host: Box::new(SystemHost::new(config.restart_command.clone())),
        notifier: Box::new(CommandNotifier::new(config.notify_command.clone())),
        retention: Box::new(KeepLatest::new(config.keep_releases)),
    }
}
