//! Collaborator configuration: process manager, proxy, ACME client, runner.

use std::path::PathBuf;

use serde::Deserialize;

/// systemd unit settings for the application server.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Unit name without the `.service` suffix.
    pub name: String,
    pub description: String,
    pub user: String,
    pub working_dir: PathBuf,
    /// Command line for `ExecStart=`.
    pub exec_start: String,
    /// Environment file loaded by the unit. Defaults to `<working_dir>/.env`.
    pub environment_file: Option<PathBuf>,
    /// Directory the rendered unit is installed into.
    pub unit_dir: PathBuf,
    /// Process manager binary.
    pub manager: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "donation".into(),
            description: "Donation web application (gunicorn)".into(),
            user: "www-data".into(),
            working_dir: PathBuf::from("/opt/donation/app"),
            exec_start:
                "/opt/donation/venv/bin/gunicorn --workers 2 --bind 127.0.0.1:8000 app:app".into(),
            environment_file: None,
            unit_dir: PathBuf::from("/etc/systemd/system"),
            manager: "systemctl".into(),
        }
    }
}

impl ServiceConfig {
    /// Environment file path, explicit or under the working directory.
    #[must_use]
    pub fn environment_file(&self) -> PathBuf {
        self.environment_file
            .clone()
            .unwrap_or_else(|| self.working_dir.join(".env"))
    }

    /// Installed unit file path.
    #[must_use]
    pub fn unit_path(&self) -> PathBuf {
        self.unit_dir.join(format!("{}.service", self.name))
    }
}

/// nginx layout and binaries.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub sites_available: PathBuf,
    pub sites_enabled: PathBuf,
    /// Web server binary used for `-t` config validation.
    pub binary: String,
    /// Service name reloaded after a config change.
    pub service: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            sites_available: PathBuf::from("/etc/nginx/sites-available"),
            sites_enabled: PathBuf::from("/etc/nginx/sites-enabled"),
            binary: "nginx".into(),
            service: "nginx".into(),
        }
    }
}

impl ProxyConfig {
    /// Site file name for `domain`.
    #[must_use]
    pub fn site_file(&self, domain: &str) -> String {
        format!("{domain}.conf")
    }
}

/// ACME client settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CertificateConfig {
    pub client: String,
    /// Registration contact. Overridden by `SITEDEPLOY_ACME_EMAIL`.
    pub email: Option<String>,
    /// Use the CA's staging environment.
    pub staging: bool,
}

impl Default for CertificateConfig {
    fn default() -> Self {
        Self {
            client: "certbot".into(),
            email: None,
            staging: false,
        }
    }
}

/// System packages installed before anything else.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DependenciesConfig {
    pub installer: String,
    pub packages: Vec<String>,
}

impl Default for DependenciesConfig {
    fn default() -> Self {
        Self {
            installer: "apt-get".into(),
            packages: vec!["nginx".into(), "certbot".into()],
        }
    }
}

/// Step runner limits and scratch space.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Upper bound for any external command, in seconds.
    pub command_timeout_secs: u64,
    /// Upper bound for one HTTP probe, in seconds.
    pub probe_timeout_secs: u64,
    /// Where rendered files are written before being copied into place.
    pub staging_dir: PathBuf,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            command_timeout_secs: 300,
            probe_timeout_secs: 10,
            staging_dir: PathBuf::from(".sitedeploy/rendered"),
        }
    }
}

/// One post-deploy HTTP probe.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProbeConfig {
    pub url: String,
    pub expect: u16,
}

/// Verification probes. Empty means the standard pair (http redirect,
/// https application root).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VerifyConfig {
    pub probes: Vec<ProbeConfig>,
}
