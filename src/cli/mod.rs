//! Command-line interface definitions.

pub mod check;
pub mod deploy;
pub mod diagnostic;
pub mod output;
pub mod plan;
pub mod render;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::error::Result;

/// Deploy a web application behind nginx with TLS, one idempotent phase at a time.
#[derive(Parser, Debug)]
#[command(name = "sitedeploy")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// JSON output for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Decrease output verbosity
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Override log level (debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Use JSON log format instead of pretty
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the deployment plan
    Deploy(DeployArgs),

    /// Show the phases a deployment would run
    Plan(ConfigPathArg),

    /// Print a rendered configuration template
    Render(RenderArgs),

    /// Validate the site configuration
    Check(ConfigPathArg),
}

/// Shared argument for commands that only need a config path.
#[derive(Parser, Debug)]
pub struct ConfigPathArg {
    /// Path to site configuration file
    #[arg(short, long, default_value = "site.toml")]
    pub config: PathBuf,
}

/// Arguments for the `deploy` subcommand.
#[derive(Parser, Debug)]
pub struct DeployArgs {
    /// Path to site configuration file
    #[arg(short, long, default_value = "site.toml")]
    pub config: PathBuf,

    /// Validate and log every phase without changing the system
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `render` subcommand.
#[derive(Parser, Debug)]
pub struct RenderArgs {
    /// Template: service-unit, proxy-http, proxy-tls or file:<path>
    pub template: String,

    /// Path to site configuration file
    #[arg(short, long, default_value = "site.toml")]
    pub config: PathBuf,
}

impl Cli {
    /// Config path of the selected subcommand.
    #[must_use]
    pub fn config_path(&self) -> &Path {
        match &self.command {
            Commands::Deploy(args) => &args.config,
            Commands::Plan(args) | Commands::Check(args) => &args.config,
            Commands::Render(args) => &args.config,
        }
    }
}

/// Dispatch the parsed command line.
pub async fn execute(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Deploy(args) => deploy::execute(cli, args).await,
        Commands::Plan(args) => plan::execute(cli, &args.config),
        Commands::Render(args) => render::execute(cli, args),
        Commands::Check(args) => check::execute(cli, &args.config),
    }
}

/// Load the configuration and start logging with CLI overrides applied.
#[allow(clippy::result_large_err)]
pub(crate) fn load_config(cli: &Cli, path: &Path) -> Result<Config> {
    let mut config = Config::load(path)?;

    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    if cli.json_logs {
        config.logging.format = "json".into();
    }
    config.init_logging();

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn deploy_accepts_config_and_dry_run() {
        let cli = Cli::parse_from(["sitedeploy", "deploy", "--config", "x.toml", "--dry-run"]);
        match &cli.command {
            Commands::Deploy(args) => {
                assert!(args.dry_run);
                assert_eq!(args.config, PathBuf::from("x.toml"));
            }
            other => panic!("expected deploy, got {other:?}"),
        }
        assert_eq!(cli.config_path(), Path::new("x.toml"));
    }

    #[test]
    fn global_flags_follow_subcommand() {
        let cli = Cli::parse_from(["sitedeploy", "plan", "--json", "--log-level", "debug"]);
        assert!(cli.json);
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert_eq!(cli.config_path(), Path::new("site.toml"));
    }
}
