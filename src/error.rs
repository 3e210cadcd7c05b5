use std::path::PathBuf;

use thiserror::Error;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Template rendering errors. Rendering never yields partial output.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("placeholder {{{{{placeholder}}}}} has no value in the site configuration")]
    MissingValue { placeholder: String },

    #[error("unknown placeholder {{{{{placeholder}}}}}")]
    UnknownPlaceholder { placeholder: String },

    #[error("unterminated placeholder starting at byte {offset}")]
    Unterminated { offset: usize },

    #[error("unknown template identifier: {0}")]
    UnknownTemplate(String),

    #[error("failed to read template {path}: {reason}")]
    Read { path: PathBuf, reason: String },
}

/// Failure of a single deployment phase.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PhaseError {
    #[error("io error on {path}: {reason}")]
    Io { path: PathBuf, reason: String },

    #[error("`{command}` failed ({status}): {stderr}")]
    Process {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("certificate request for {domains} failed: {detail}")]
    Certificate { domains: String, detail: String },

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("probe {url} expected {expected}, {observed}")]
    Probe {
        url: String,
        expected: u16,
        observed: String,
    },

    #[error("invalid phase parameters: {reason}")]
    InvalidPhase { reason: String },

    #[error("cancelled before start")]
    Cancelled,
}

impl PhaseError {
    /// Build an invalid-parameter error.
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidPhase {
            reason: reason.into(),
        }
    }

    /// Build an io error for `path`.
    pub fn io(path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            reason: err.to_string(),
        }
    }

    /// Short category name used in logs and JSON output.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Io { .. } => "io",
            Self::Process { .. } => "process",
            Self::Certificate { .. } => "certificate",
            Self::Template(_) => "template",
            Self::Probe { .. } => "probe",
            Self::InvalidPhase { .. } => "invalid_phase",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Plan construction errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("plan is empty")]
    Empty,

    #[error("duplicate phase name: {0}")]
    DuplicatePhase(String),

    #[error("phase {phase}: {reason}")]
    InvalidPhase { phase: String, reason: String },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error("phase {phase} failed: {source}")]
    Deployment {
        phase: String,
        #[source]
        source: PhaseError,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
