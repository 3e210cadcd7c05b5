//! sitedeploy - idempotent deployment of a web application behind nginx with TLS.
//!
//! The crate turns a manual runbook (install packages, register a systemd
//! service, install a proxy site, issue a certificate, verify) into an
//! ordered plan of phases executed strictly in sequence, stopping at the
//! first failure.
//!
//! # Modules
//!
//! - [`config`] - Site configuration loading from TOML
//! - [`domain`] - Phases, plans, results and run state
//! - [`render`] - Template rendering for systemd units and nginx sites
//! - [`runner`] - Step runners that perform (or simulate) each phase
//! - [`probe`] - HTTP status probes
//! - [`orchestrator`] - Sequential, fail-fast plan execution
//! - [`plan`] - Standard runbook and explicit plan construction
//! - [`cli`] - Command-line surface
//! - [`error`] - Error types for the crate
//!
//! # Example
//!
//! ```no_run
//! use sitedeploy::config::Config;
//! use sitedeploy::orchestrator::Orchestrator;
//! use sitedeploy::runner::DryRunRunner;
//!
//! # async fn demo() -> sitedeploy::error::Result<()> {
//! let config = Config::load("site.toml")?;
//! let built = sitedeploy::plan::build(&config)?;
//! let report = Orchestrator::new(DryRunRunner).run(built.plan()).await;
//! println!("{}", report.state());
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod orchestrator;
pub mod plan;
pub mod probe;
pub mod render;
pub mod runner;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
