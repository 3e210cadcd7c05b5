//! Site parameters: domains, certificate locations, upstream address.

use std::collections::HashSet;
use std::path::PathBuf;

use serde::Deserialize;
use url::Url;

use crate::error::{ConfigError, Result};

const LETSENCRYPT_LIVE: &str = "/etc/letsencrypt/live";

/// Site-specific parameters consumed by rendering, certificate issuance and
/// verification. Built once from the configuration file and shared read-only.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SiteConfig {
    /// Primary domain; also names the certificate lineage.
    #[serde(default)]
    pub domain: String,
    /// Additional names on the same certificate, in declared order.
    #[serde(default)]
    pub alt_domains: Vec<String>,
    /// Address the proxy forwards to, e.g. `127.0.0.1:8000`.
    #[serde(default)]
    pub upstream: String,
    /// Full chain path. Defaults to the certbot live directory of `domain`.
    #[serde(default)]
    pub cert_path: Option<PathBuf>,
    /// Private key path. Defaults to the certbot live directory of `domain`.
    #[serde(default)]
    pub cert_key_path: Option<PathBuf>,
    /// Directory served at `/.well-known/acme-challenge/`.
    #[serde(default = "default_webroot")]
    pub webroot: PathBuf,
    /// Public path prefix the application is mounted under.
    #[serde(default = "default_location_prefix")]
    pub location_prefix: String,
    /// Static files served directly by the proxy.
    #[serde(default)]
    pub static_root: Option<PathBuf>,
}

fn default_webroot() -> PathBuf {
    PathBuf::from("/var/www/letsencrypt")
}

fn default_location_prefix() -> String {
    "/donation".into()
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            domain: String::new(),
            alt_domains: Vec::new(),
            upstream: String::new(),
            cert_path: None,
            cert_key_path: None,
            webroot: default_webroot(),
            location_prefix: default_location_prefix(),
            static_root: None,
        }
    }
}

impl SiteConfig {
    /// Create a site with the given primary domain and upstream.
    pub fn new(domain: impl Into<String>, upstream: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            upstream: upstream.into(),
            ..Self::default()
        }
    }

    /// Builder-style alternate domains.
    #[must_use]
    pub fn with_alt_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.alt_domains = domains.into_iter().map(Into::into).collect();
        self
    }

    /// Full chain certificate path (explicit or certbot default).
    #[must_use]
    pub fn cert_path(&self) -> Option<PathBuf> {
        self.cert_path
            .clone()
            .or_else(|| self.live_dir().map(|dir| dir.join("fullchain.pem")))
    }

    /// Private key path (explicit or certbot default).
    #[must_use]
    pub fn cert_key_path(&self) -> Option<PathBuf> {
        self.cert_key_path
            .clone()
            .or_else(|| self.live_dir().map(|dir| dir.join("privkey.pem")))
    }

    fn live_dir(&self) -> Option<PathBuf> {
        if self.domain.trim().is_empty() {
            None
        } else {
            Some(PathBuf::from(LETSENCRYPT_LIVE).join(&self.domain))
        }
    }

    /// Primary domain followed by alternates.
    pub fn all_domains(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.domain.as_str()).chain(self.alt_domains.iter().map(String::as_str))
    }

    /// Space-separated names for an nginx `server_name` directive.
    #[must_use]
    pub fn server_names(&self) -> String {
        self.all_domains().collect::<Vec<_>>().join(" ")
    }

    /// Upstream as an absolute URL suitable for `proxy_pass`.
    #[must_use]
    pub fn upstream_url(&self) -> String {
        if self.upstream.contains("://") {
            self.upstream.clone()
        } else {
            format!("http://{}", self.upstream)
        }
    }

    #[allow(clippy::result_large_err)]
    pub(crate) fn validate(&self) -> Result<()> {
        if self.domain.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "site.domain",
            }
            .into());
        }

        let mut seen = HashSet::new();
        for (index, name) in self.all_domains().enumerate() {
            if name.contains('*') {
                return Err(ConfigError::InvalidValue {
                    field: if index == 0 { "site.domain" } else { "site.alt_domains" },
                    reason: format!("'{name}' is a wildcard; webroot validation cannot issue wildcard certificates"),
                }
                .into());
            }
            if !is_hostname(name) {
                return Err(ConfigError::InvalidValue {
                    field: "site.alt_domains",
                    reason: format!("'{name}' is not a valid domain name"),
                }
                .into());
            }
            if !seen.insert(name.to_ascii_lowercase()) {
                return Err(ConfigError::InvalidValue {
                    field: "site.alt_domains",
                    reason: format!("'{name}' is listed more than once"),
                }
                .into());
            }
        }

        if self.upstream.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "site.upstream",
            }
            .into());
        }
        let upstream = Url::parse(&self.upstream_url()).map_err(|e| ConfigError::InvalidValue {
            field: "site.upstream",
            reason: e.to_string(),
        })?;
        if upstream.host_str().is_none() {
            return Err(ConfigError::InvalidValue {
                field: "site.upstream",
                reason: "upstream has no host".into(),
            }
            .into());
        }

        if !self.location_prefix.starts_with('/') {
            return Err(ConfigError::InvalidValue {
                field: "site.location_prefix",
                reason: "must start with '/'".into(),
            }
            .into());
        }
        if self.static_root.is_some() && self.location_prefix.trim_end_matches('/').is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "site.static_root",
                reason: "the application is mounted at '/', so there is no root left to serve static files from".into(),
            }
            .into());
        }

        Ok(())
    }

    /// Trim the trailing slash from the location prefix (`/donation/` and
    /// `/donation` mount the same application).
    pub(crate) fn normalize(&mut self) {
        let trimmed = self.location_prefix.trim_end_matches('/');
        self.location_prefix = if trimmed.is_empty() {
            "/".into()
        } else {
            trimmed.into()
        };
    }
}

fn is_hostname(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 253
        && name.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn cert_paths_default_to_letsencrypt_live_dir() {
        let site = SiteConfig::new("example.org", "127.0.0.1:8000");
        assert_eq!(
            site.cert_path(),
            Some(PathBuf::from("/etc/letsencrypt/live/example.org/fullchain.pem"))
        );
        assert_eq!(
            site.cert_key_path(),
            Some(PathBuf::from("/etc/letsencrypt/live/example.org/privkey.pem"))
        );
    }

    #[test]
    fn cert_paths_absent_without_domain() {
        let site = SiteConfig::default();
        assert_eq!(site.cert_path(), None);
        assert_eq!(site.cert_key_path(), None);
    }

    #[test]
    fn server_names_keep_declared_order() {
        let site = SiteConfig::new("example.org", "127.0.0.1:8000")
            .with_alt_domains(["www.example.org", "donate.example.org"]);
        assert_eq!(
            site.server_names(),
            "example.org www.example.org donate.example.org"
        );
    }

    #[test]
    fn validate_rejects_duplicate_alternates() {
        let site = SiteConfig::new("example.org", "127.0.0.1:8000")
            .with_alt_domains(["www.example.org", "WWW.example.org"]);
        assert!(matches!(
            site.validate(),
            Err(Error::Config(ConfigError::InvalidValue {
                field: "site.alt_domains",
                ..
            }))
        ));
    }

    #[test]
    fn validate_rejects_primary_repeated_as_alternate() {
        let site =
            SiteConfig::new("example.org", "127.0.0.1:8000").with_alt_domains(["example.org"]);
        assert!(site.validate().is_err());
    }

    #[test]
    fn validate_requires_domain_and_upstream() {
        let missing_domain = SiteConfig::new("", "127.0.0.1:8000");
        assert!(matches!(
            missing_domain.validate(),
            Err(Error::Config(ConfigError::MissingField {
                field: "site.domain"
            }))
        ));

        let missing_upstream = SiteConfig::new("example.org", "");
        assert!(matches!(
            missing_upstream.validate(),
            Err(Error::Config(ConfigError::MissingField {
                field: "site.upstream"
            }))
        ));
    }

    #[test]
    fn upstream_url_adds_scheme() {
        assert_eq!(
            SiteConfig::new("example.org", "127.0.0.1:8000").upstream_url(),
            "http://127.0.0.1:8000"
        );
        assert_eq!(
            SiteConfig::new("example.org", "unix:/run/app.sock").upstream_url(),
            "http://unix:/run/app.sock"
        );
    }

    #[test]
    fn normalize_trims_trailing_slash() {
        let mut site = SiteConfig::new("example.org", "127.0.0.1:8000");
        site.location_prefix = "/donation/".into();
        site.normalize();
        assert_eq!(site.location_prefix, "/donation");

        site.location_prefix = "/".into();
        site.normalize();
        assert_eq!(site.location_prefix, "/");
    }

    #[test]
    fn validate_rejects_wildcard_names() {
        let wildcard_alt =
            SiteConfig::new("example.org", "127.0.0.1:8000").with_alt_domains(["*.example.org"]);
        assert!(matches!(
            wildcard_alt.validate(),
            Err(Error::Config(ConfigError::InvalidValue {
                field: "site.alt_domains",
                ..
            }))
        ));

        let wildcard_primary = SiteConfig::new("*.example.org", "127.0.0.1:8000");
        assert!(matches!(
            wildcard_primary.validate(),
            Err(Error::Config(ConfigError::InvalidValue {
                field: "site.domain",
                ..
            }))
        ));
    }

    #[test]
    fn validate_rejects_static_root_when_mounted_at_root() {
        let mut site = SiteConfig::new("example.org", "127.0.0.1:8000");
        site.location_prefix = "/".into();
        site.static_root = Some(PathBuf::from("/srv/www"));
        assert!(matches!(
            site.validate(),
            Err(Error::Config(ConfigError::InvalidValue {
                field: "site.static_root",
                ..
            }))
        ));

        site.static_root = None;
        assert!(site.validate().is_ok());
    }
}
