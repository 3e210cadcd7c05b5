//! Deployment configuration loading and validation.
//!
//! Configuration is loaded once from a TOML file, with an environment
//! override for the ACME contact address (`SITEDEPLOY_ACME_EMAIL`). The
//! resulting [`Config`] is passed by reference into the plan builder and the
//! orchestrator and is never mutated after [`Config::load`] returns.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use url::Url;

use crate::error::{ConfigError, Result};
use crate::probe::ExpectedStatus;

mod logging;
mod service;
mod site;

pub use logging::LoggingConfig;
pub use service::{
    CertificateConfig, DependenciesConfig, ProbeConfig, ProxyConfig, RunnerConfig, ServiceConfig,
    VerifyConfig,
};
pub use site::SiteConfig;

/// Environment variable overriding `certificate.email`.
pub const ACME_EMAIL_ENV: &str = "SITEDEPLOY_ACME_EMAIL";

/// An explicit phase declared in the configuration file.
///
/// `command` is shorthand for `RunCommand` parameters: the first element is
/// the program, the rest its arguments. `template` on a `copy-file` phase
/// renders that template into the staging directory and uses it as source.
#[derive(Debug, Clone, Deserialize)]
pub struct PhaseConfig {
    pub name: String,
    pub action: String,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    #[serde(default)]
    pub command: Option<Vec<String>>,
    #[serde(default)]
    pub template: Option<String>,
}

/// Main deployment configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    pub site: SiteConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub dependencies: DependenciesConfig,
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
    #[serde(default)]
    pub certificate: CertificateConfig,
    #[serde(default)]
    pub runner: RunnerConfig,
    #[serde(default)]
    pub verify: VerifyConfig,
    /// Explicit plan; replaces the standard runbook when non-empty.
    #[serde(default)]
    pub phases: Vec<PhaseConfig>,
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::from_toml_str(&content)
    }

    /// Parse, apply environment overrides, normalize and validate.
    #[allow(clippy::result_large_err)]
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;

        if let Ok(email) = std::env::var(ACME_EMAIL_ENV) {
            if !email.trim().is_empty() {
                config.certificate.email = Some(email.trim().to_string());
            }
        }

        config.site.normalize();
        config.validate()?;

        Ok(config)
    }

    #[allow(clippy::result_large_err)]
    fn validate(&self) -> Result<()> {
        self.site.validate()?;

        if self.service.name.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "service.name",
            }
            .into());
        }
        if self.service.exec_start.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "service.exec_start",
            }
            .into());
        }
        if self.runner.command_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "runner.command_timeout_secs",
                reason: "must be greater than zero".into(),
            }
            .into());
        }
        if self.runner.probe_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "runner.probe_timeout_secs",
                reason: "must be greater than zero".into(),
            }
            .into());
        }

        for probe in &self.verify.probes {
            ExpectedStatus::try_from(probe.expect).map_err(|_| ConfigError::InvalidValue {
                field: "verify.probes.expect",
                reason: format!("{} is not one of 200, 301, 302", probe.expect),
            })?;
            Url::parse(&probe.url).map_err(|e| ConfigError::InvalidValue {
                field: "verify.probes.url",
                reason: format!("'{}': {e}", probe.url),
            })?;
        }

        for phase in &self.phases {
            if phase.name.trim().is_empty() {
                return Err(ConfigError::MissingField {
                    field: "phases.name",
                }
                .into());
            }
        }

        Ok(())
    }

    /// Probes to run after deployment, falling back to the standard pair.
    #[must_use]
    pub fn probes(&self) -> Vec<ProbeConfig> {
        if !self.verify.probes.is_empty() {
            return self.verify.probes.clone();
        }
        vec![
            ProbeConfig {
                url: format!("http://{}/", self.site.domain),
                expect: 301,
            },
            ProbeConfig {
                url: format!(
                    "https://{}{}/",
                    self.site.domain,
                    self.site.location_prefix.trim_end_matches('/')
                ),
                expect: 200,
            },
        ]
    }

    /// Initialize logging with the configured settings.
    pub fn init_logging(&self) {
        self.logging.init();
    }
}
