mod commands;
mod config;
mod services;
mod types;
mod utils;


use clap::{CommandFactory, Parser, Subcommand};
use colored::Colorize;
use commands::{SyncService, check_status, display_status, display_version};
use config::{Config, EnvironmentConfig};
use services::{GitRunner, SystemGit, install_interrupt_handler};
use std::path::PathBuf;
use utils::{ConsoleLogger, Result, SyncError, TerminalPrompter, logging};

#[derive(Parser)]
#[command(name = "claude-sync", version)]
#[command(about = "Keep your Claude Code configuration in sync across machines with git")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Clone, Copy)]
enum Commands {
    /// Commit, pull and push ~/.claude (default), or set it up on first run
    Sync,
    /// Show repository, modified files, plugins, hooks and skills
    Status,
    /// Show version information
    Version,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

fn main() {
    // Load and validate environment configuration early
    let env_config = match EnvironmentConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "{} Failed to load environment configuration: {}",
                "Error:".red().bold(),
                e
            );
            eprintln!(
                "{} Please check your CLAUDE_SYNC_* environment variables",
                "Help:".yellow().bold()
            );
            std::process::exit(1);
        }
    };

    logging::init_logging(env_config.log_level);
    env_config.display_summary();

    let cli = Cli::parse();

    if let Err(e) = run(cli, env_config) {
        eprintln!("{} {}", "Error:".red().bold(), e);
        match &e {
            SyncError::Git(failure) => log::debug!("Failure code: {}", failure.kind.code()),
            SyncError::Conflict { path } => {
                eprintln!("  {} {}", "Repository:".bold(), path.display())
            }
            _ => {}
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli, env_config: EnvironmentConfig) -> Result<()> {
    // Bare `claude-sync` is a sync
    match cli.command.unwrap_or(Commands::Sync) {
        Commands::Sync => run_sync(&env_config),
        Commands::Status => run_status(&env_config),
        Commands::Version => {
            display_version();
            Ok(())
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
            Ok(())
        }
    }
}

fn system_git(env_config: &EnvironmentConfig, config: &Config) -> Result<SystemGit> {
    let cancel = install_interrupt_handler()?;
    let runner = GitRunner::new(&env_config.git_binary, cancel);
    Ok(SystemGit::new(runner, config.general.default_branch.clone()))
}

fn resolve(env_config: &EnvironmentConfig) -> Result<(Config, PathBuf)> {
    let config = Config::load(env_config)?;
    let root = config.sync_root(env_config)?;
    log::debug!("Sync root: {}", root.display());
    Ok((config, root))
}

fn run_sync(env_config: &EnvironmentConfig) -> Result<()> {
    let (config, root) = resolve(env_config)?;
    let git = system_git(env_config, &config)?;
    let prompter = TerminalPrompter::default();
    let logger = ConsoleLogger;

    let outcome = SyncService::new(&git, &prompter, &logger, root)
        .with_recent_commits(config.general.recent_commits)
        .run()?;
    log::debug!("Run finished: {:?}", outcome);
    Ok(())
}

fn run_status(env_config: &EnvironmentConfig) -> Result<()> {
    let (config, root) = resolve(env_config)?;
    let git = system_git(env_config, &config)?;
    let report = check_status(&git, &root)?;
    display_status(&report, &ConsoleLogger);
    Ok(())
}
