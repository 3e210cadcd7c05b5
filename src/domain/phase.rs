//! Phase: one named, immutable deployment step.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::PhaseError;
use crate::probe::ExpectedStatus;

/// The capability a phase exercises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhaseAction {
    CopyFile,
    RunCommand,
    ReloadService,
    RequestCertificate,
    Probe,
}

impl PhaseAction {
    /// Parameter keys that must be present and non-empty.
    #[must_use]
    pub const fn required_params(self) -> &'static [&'static str] {
        match self {
            Self::CopyFile => &["source", "destination"],
            Self::RunCommand => &["program"],
            Self::ReloadService => &["service"],
            Self::RequestCertificate => &["domains", "webroot"],
            Self::Probe => &["url", "expect"],
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CopyFile => "copy-file",
            Self::RunCommand => "run-command",
            Self::ReloadService => "reload-service",
            Self::RequestCertificate => "request-certificate",
            Self::Probe => "probe",
        }
    }
}

impl fmt::Display for PhaseAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PhaseAction {
    type Err = PhaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "copy-file" => Ok(Self::CopyFile),
            "run-command" => Ok(Self::RunCommand),
            "reload-service" => Ok(Self::ReloadService),
            "request-certificate" => Ok(Self::RequestCertificate),
            "probe" => Ok(Self::Probe),
            other => Err(PhaseError::invalid(format!("unknown action '{other}'"))),
        }
    }
}

/// A named deployment step. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phase {
    name: String,
    action: PhaseAction,
    params: BTreeMap<String, String>,
}

impl Phase {
    /// Create a phase from raw parameters.
    ///
    /// Parameters are checked against the action's required keys; see
    /// [`Phase::validate`].
    pub fn new(
        name: impl Into<String>,
        action: PhaseAction,
        params: BTreeMap<String, String>,
    ) -> Result<Self, PhaseError> {
        let phase = Self {
            name: name.into(),
            action,
            params,
        };
        phase.validate()?;
        Ok(phase)
    }

    /// Copy `source` to `destination`.
    pub fn copy_file(name: impl Into<String>, source: &Path, destination: &Path) -> Self {
        Self::from_pairs(
            name,
            PhaseAction::CopyFile,
            [
                ("source", source.display().to_string()),
                ("destination", destination.display().to_string()),
            ],
        )
    }

    /// Run `program` with a fixed argument list.
    pub fn run_command<S: AsRef<str>>(name: impl Into<String>, program: &str, args: &[S]) -> Self {
        let args: Vec<&str> = args.iter().map(AsRef::as_ref).collect();
        Self::from_pairs(
            name,
            PhaseAction::RunCommand,
            [
                ("program", program.to_string()),
                ("args", encode_args(&args)),
            ],
        )
    }

    /// `<manager> reload <service>`.
    pub fn reload_service(name: impl Into<String>, manager: &str, service: &str) -> Self {
        Self::from_pairs(
            name,
            PhaseAction::ReloadService,
            [
                ("manager", manager.to_string()),
                ("service", service.to_string()),
            ],
        )
    }

    /// Webroot-validated certificate for `domains` (primary first).
    pub fn request_certificate<S: AsRef<str>>(
        name: impl Into<String>,
        domains: &[S],
        webroot: &Path,
    ) -> Self {
        let domains: Vec<&str> = domains.iter().map(AsRef::as_ref).collect();
        Self::from_pairs(
            name,
            PhaseAction::RequestCertificate,
            [
                ("domains", domains.join(",")),
                ("webroot", webroot.display().to_string()),
            ],
        )
    }

    /// HTTP GET `url`, expecting `expect`.
    pub fn probe(name: impl Into<String>, url: &str, expect: ExpectedStatus) -> Self {
        Self::from_pairs(
            name,
            PhaseAction::Probe,
            [
                ("url", url.to_string()),
                ("expect", expect.code().to_string()),
            ],
        )
    }

    /// Return a copy carrying an extra parameter. The receiver is unchanged.
    #[must_use]
    pub fn with_param(&self, key: &str, value: impl Into<String>) -> Self {
        let mut params = self.params.clone();
        params.insert(key.to_string(), value.into());
        Self {
            name: self.name.clone(),
            action: self.action,
            params,
        }
    }

    fn from_pairs<const N: usize>(
        name: impl Into<String>,
        action: PhaseAction,
        pairs: [(&str, String); N],
    ) -> Self {
        Self {
            name: name.into(),
            action,
            params: pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn action(&self) -> PhaseAction {
        self.action
    }

    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    /// Optional parameter.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Required parameter.
    pub fn require(&self, key: &str) -> Result<&str, PhaseError> {
        self.param(key).ok_or_else(|| {
            PhaseError::invalid(format!("{} requires parameter '{key}'", self.action))
        })
    }

    /// Optional boolean parameter (`true`/`false`), defaulting to false.
    pub fn flag(&self, key: &str) -> Result<bool, PhaseError> {
        match self.param(key) {
            None => Ok(false),
            Some(v) => v
                .parse()
                .map_err(|_| PhaseError::invalid(format!("'{key}' must be true or false"))),
        }
    }

    /// Decoded `args` parameter of a `RunCommand` phase.
    pub fn args(&self) -> Result<Vec<String>, PhaseError> {
        match self.param("args") {
            None => Ok(Vec::new()),
            Some(raw) => serde_json::from_str(raw)
                .map_err(|e| PhaseError::invalid(format!("'args' is not a JSON string array: {e}"))),
        }
    }

    /// Domains of a `RequestCertificate` phase, primary first.
    pub fn domains(&self) -> Result<Vec<String>, PhaseError> {
        let domains: Vec<String> = self
            .require("domains")?
            .split(',')
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(String::from)
            .collect();
        if domains.is_empty() {
            return Err(PhaseError::invalid("'domains' lists no domain"));
        }
        Ok(domains)
    }

    /// Expected status of a `Probe` phase.
    pub fn expected_status(&self) -> Result<ExpectedStatus, PhaseError> {
        let raw = self.require("expect")?;
        raw.parse::<u16>()
            .ok()
            .and_then(|code| ExpectedStatus::try_from(code).ok())
            .ok_or_else(|| PhaseError::invalid(format!("'expect' {raw} is not one of 200, 301, 302")))
    }

    /// Check that every parameter the action needs is present and decodable.
    pub fn validate(&self) -> Result<(), PhaseError> {
        if self.name.trim().is_empty() {
            return Err(PhaseError::invalid("phase name is empty"));
        }
        for key in self.action.required_params() {
            self.require(key)?;
        }
        match self.action {
            PhaseAction::RunCommand => {
                self.args()?;
            }
            PhaseAction::RequestCertificate => {
                self.domains()?;
                self.flag("staging")?;
            }
            PhaseAction::Probe => {
                self.expected_status()?;
            }
            PhaseAction::CopyFile => {
                if let Some(mode) = self.param("mode") {
                    u32::from_str_radix(mode, 8)
                        .map_err(|_| PhaseError::invalid(format!("'mode' {mode} is not octal")))?;
                }
            }
            PhaseAction::ReloadService => {}
        }
        Ok(())
    }

    /// One-line human description.
    #[must_use]
    pub fn describe(&self) -> String {
        let p = |k: &str| self.param(k).unwrap_or("?").to_string();
        match self.action {
            PhaseAction::CopyFile => format!("copy {} -> {}", p("source"), p("destination")),
            PhaseAction::RunCommand => {
                let mut line = p("program");
                for arg in self.args().unwrap_or_default() {
                    line.push(' ');
                    line.push_str(&arg);
                }
                line
            }
            PhaseAction::ReloadService => format!(
                "{} reload {}",
                self.param("manager").unwrap_or("systemctl"),
                p("service")
            ),
            PhaseAction::RequestCertificate => {
                format!("certificate for {} via {}", p("domains"), p("webroot"))
            }
            PhaseAction::Probe => format!("GET {} expect {}", p("url"), p("expect")),
        }
    }
}

fn encode_args(args: &[&str]) -> String {
    // Vec<&str> always serializes.
    serde_json::to_string(args).unwrap_or_else(|_| "[]".into())
}
