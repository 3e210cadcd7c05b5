//! Miette diagnostics for configuration errors.
//!
//! A TOML parse error is shown with the offending lines of the file and a
//! label at the failing span.

use std::path::Path;

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

use crate::error::{ConfigError, Error};

/// Configuration error with source location context.
#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(sitedeploy::config))]
pub struct ConfigDiagnostic {
    pub message: String,

    #[source_code]
    pub src: NamedSource<String>,

    #[label("here")]
    pub span: SourceSpan,

    #[help]
    pub help: Option<String>,
}

/// Build a rich diagnostic for `err` if it is a parse error in the file at
/// `path`. Other errors have no useful span and return `None`.
#[must_use]
pub fn for_config_error(path: &Path, err: &Error) -> Option<ConfigDiagnostic> {
    let Error::Config(ConfigError::Parse(parse)) = err else {
        return None;
    };
    let span = parse.span()?;
    let source = std::fs::read_to_string(path).ok()?;

    Some(ConfigDiagnostic {
        message: format!("failed to parse {}: {}", path.display(), parse.message()),
        src: NamedSource::new(path.display().to_string(), source),
        span: (span.start, span.end.saturating_sub(span.start)).into(),
        help: Some("run `sitedeploy check --config <path>` after fixing the file".into()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn parse_errors_get_a_span() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site.toml");
        std::fs::write(&path, "[site]\ndomain = example.org\n").unwrap();

        let err = Config::load(&path).unwrap_err();
        let diagnostic = for_config_error(&path, &err).expect("parse error has a span");
        assert!(diagnostic.message.contains("site.toml"));
    }

    #[test]
    fn validation_errors_have_no_diagnostic() {
        let err: Error = ConfigError::MissingField {
            field: "site.domain",
        }
        .into();
        assert!(for_config_error(Path::new("site.toml"), &err).is_none());
    }
}
