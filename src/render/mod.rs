//! Configuration rendering: templates plus site parameters → file contents.
//!
//! Rendering is a pure transformation. Either every placeholder resolves and
//! the full text is returned, or a [`TemplateError`] is returned and nothing
//! else; writing the result to disk is the job of a `CopyFile` phase.

mod templates;

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::config::{ServiceConfig, SiteConfig};
use crate::error::TemplateError;

/// Placeholders bound from [`SiteConfig`].
pub const SITE_PLACEHOLDERS: &[&str] = &[
    "domain",
    "alt_domains",
    "server_names",
    "cert_path",
    "cert_key_path",
    "upstream",
    "webroot",
    "location_prefix",
    "static_root",
];

/// Placeholders bound from [`ServiceConfig`].
pub const SERVICE_PLACEHOLDERS: &[&str] = &[
    "service_name",
    "service_description",
    "service_user",
    "working_dir",
    "exec_start",
    "environment_file",
];

/// Placeholders allowed to render as an empty string.
const OPTIONAL_PLACEHOLDERS: &[&str] = &["alt_domains"];

/// Which template to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateId {
    /// systemd unit for the application server.
    ServiceUnit,
    /// nginx port-80 site (ACME webroot + https redirect).
    ProxyHttp,
    /// nginx port-80 and port-443 sites with TLS termination.
    ProxyTls,
    /// Operator-supplied template file.
    File(PathBuf),
}

impl FromStr for TemplateId {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "service-unit" => Ok(Self::ServiceUnit),
            "proxy-http" => Ok(Self::ProxyHttp),
            "proxy-tls" => Ok(Self::ProxyTls),
            other => match other.strip_prefix("file:") {
                Some(path) if !path.is_empty() => Ok(Self::File(PathBuf::from(path))),
                _ => Err(TemplateError::UnknownTemplate(other.to_string())),
            },
        }
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ServiceUnit => f.write_str("service-unit"),
            Self::ProxyHttp => f.write_str("proxy-http"),
            Self::ProxyTls => f.write_str("proxy-tls"),
            Self::File(path) => write!(f, "file:{}", path.display()),
        }
    }
}

/// Renders templates against a site (and optionally a service) definition.
#[derive(Debug, Clone)]
pub struct ConfigRenderer<'a> {
    site: &'a SiteConfig,
    service: Option<&'a ServiceConfig>,
}

impl<'a> ConfigRenderer<'a> {
    pub fn new(site: &'a SiteConfig) -> Self {
        Self {
            site,
            service: None,
        }
    }

    /// Also bind the service placeholders.
    #[must_use]
    pub fn with_service(mut self, service: &'a ServiceConfig) -> Self {
        self.service = Some(service);
        self
    }

    /// Render a template by identifier.
    pub fn render(&self, id: &TemplateId) -> Result<String, TemplateError> {
        let source = self.source(id)?;
        self.render_str(&source)
    }

    /// Render literal template text.
    pub fn render_str(&self, template: &str) -> Result<String, TemplateError> {
        let bindings = self.bindings();
        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        let mut offset = 0;

        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let after_open = &rest[start + 2..];
            let Some(end) = after_open.find("}}") else {
                return Err(TemplateError::Unterminated {
                    offset: offset + start,
                });
            };

            let name = after_open[..end].trim();
            let value = match bindings.get(name) {
                None => {
                    return Err(TemplateError::UnknownPlaceholder {
                        placeholder: name.to_string(),
                    })
                }
                Some(value) => value.as_deref().unwrap_or_default(),
            };
            if value.is_empty() && !OPTIONAL_PLACEHOLDERS.contains(&name) {
                return Err(TemplateError::MissingValue {
                    placeholder: name.to_string(),
                });
            }
            out.push_str(value);

            let consumed = start + 2 + end + 2;
            offset += consumed;
            rest = &rest[consumed..];
        }
        out.push_str(rest);

        Ok(out)
    }

    fn source(&self, id: &TemplateId) -> Result<String, TemplateError> {
        match id {
            TemplateId::ServiceUnit => Ok(templates::SERVICE_UNIT.to_string()),
            TemplateId::ProxyHttp => Ok(templates::PROXY_HTTP.to_string()),
            TemplateId::ProxyTls => {
                let mut text = String::from(templates::PROXY_HTTP);
                text.push_str(templates::PROXY_TLS_HEAD);
                // An application mounted at `/` already owns `location /`.
                let mounted_at_root = self.site.location_prefix.trim_end_matches('/').is_empty();
                if !mounted_at_root {
                    text.push_str(if self.site.static_root.is_some() {
                        templates::PROXY_TLS_STATIC
                    } else {
                        templates::PROXY_TLS_ROOT_UPSTREAM
                    });
                }
                text.push_str(templates::PROXY_TLS_TAIL);
                Ok(text)
            }
            TemplateId::File(path) => {
                std::fs::read_to_string(path).map_err(|e| TemplateError::Read {
                    path: path.clone(),
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Every recognized placeholder mapped to its value, `None` when the
    /// configuration has nothing for it.
    fn bindings(&self) -> BTreeMap<&'static str, Option<String>> {
        let site = self.site;
        let path = |p: Option<PathBuf>| p.map(|p| p.display().to_string());
        let non_empty = |s: &str| (!s.trim().is_empty()).then(|| s.to_string());

        let mut map = BTreeMap::new();
        map.insert("domain", non_empty(&site.domain));
        map.insert("alt_domains", Some(site.alt_domains.join(" ")));
        map.insert(
            "server_names",
            non_empty(&site.domain).map(|_| site.server_names()),
        );
        map.insert("cert_path", path(site.cert_path()));
        map.insert("cert_key_path", path(site.cert_key_path()));
        map.insert(
            "upstream",
            non_empty(&site.upstream).map(|_| site.upstream_url()),
        );
        map.insert("webroot", path(Some(site.webroot.clone())));
        map.insert(
            "location_prefix",
            Some(format!("{}/", site.location_prefix.trim_end_matches('/'))),
        );
        map.insert("static_root", path(site.static_root.clone()));

        let service = self.service;
        map.insert("service_name", service.and_then(|s| non_empty(&s.name)));
        map.insert(
            "service_description",
            service.and_then(|s| non_empty(&s.description)),
        );
        map.insert("service_user", service.and_then(|s| non_empty(&s.user)));
        map.insert(
            "working_dir",
            service.map(|s| s.working_dir.display().to_string()),
        );
        map.insert("exec_start", service.and_then(|s| non_empty(&s.exec_start)));
        map.insert(
            "environment_file",
            service.map(|s| s.environment_file().display().to_string()),
        );

        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site() -> SiteConfig {
        SiteConfig::new("example.org", "127.0.0.1:8000").with_alt_domains(["www.example.org"])
    }

    #[test]
    fn substitutes_site_placeholders() {
        let site = site();
        let out = ConfigRenderer::new(&site)
            .render_str("{{domain}}|{{alt_domains}}|{{upstream}}|{{ cert_path }}")
            .unwrap();
        assert_eq!(
            out,
            "example.org|www.example.org|http://127.0.0.1:8000|/etc/letsencrypt/live/example.org/fullchain.pem"
        );
    }

    #[test]
    fn missing_domain_is_an_error_without_output() {
        let site = SiteConfig::new("", "127.0.0.1:8000");
        let result = ConfigRenderer::new(&site).render_str("server_name {{domain}};");
        assert_eq!(
            result,
            Err(TemplateError::MissingValue {
                placeholder: "domain".into()
            })
        );
    }

    #[test]
    fn empty_alt_domains_render_empty() {
        let site = SiteConfig::new("example.org", "127.0.0.1:8000");
        let out = ConfigRenderer::new(&site)
            .render_str("[{{alt_domains}}]")
            .unwrap();
        assert_eq!(out, "[]");
    }

    #[test]
    fn unknown_and_unterminated_placeholders_fail() {
        let site = site();
        let renderer = ConfigRenderer::new(&site);
        assert_eq!(
            renderer.render_str("{{colour}}"),
            Err(TemplateError::UnknownPlaceholder {
                placeholder: "colour".into()
            })
        );
        assert_eq!(
            renderer.render_str("ok {{domain}} then {{domain"),
            Err(TemplateError::Unterminated { offset: 19 })
        );
    }

    #[test]
    fn nginx_single_braces_pass_through() {
        let site = site();
        let out = ConfigRenderer::new(&site)
            .render_str("server { server_name {{domain}}; }")
            .unwrap();
        assert_eq!(out, "server { server_name example.org; }");
    }

    #[test]
    fn service_unit_needs_service_bindings() {
        let site = site();
        assert_eq!(
            ConfigRenderer::new(&site).render(&TemplateId::ServiceUnit),
            Err(TemplateError::MissingValue {
                placeholder: "service_description".into()
            })
        );

        let service = ServiceConfig::default();
        let unit = ConfigRenderer::new(&site)
            .with_service(&service)
            .render(&TemplateId::ServiceUnit)
            .unwrap();
        assert!(unit.contains("User=www-data"));
        assert!(unit.contains("WorkingDirectory=/opt/donation/app"));
        assert!(unit.contains("EnvironmentFile=-/opt/donation/app/.env"));
        assert!(unit.contains("ExecStart=/opt/donation/venv/bin/gunicorn"));
    }

    #[test]
    fn proxy_http_serves_challenge_and_redirects() {
        let site = site();
        let conf = ConfigRenderer::new(&site)
            .render(&TemplateId::ProxyHttp)
            .unwrap();
        assert!(conf.contains("server_name example.org www.example.org;"));
        assert!(conf.contains("root /var/www/letsencrypt;"));
        assert!(conf.contains("return 301 https://$host$request_uri;"));
        assert!(!conf.contains("{{"));
    }

    #[test]
    fn proxy_tls_forwards_to_upstream_with_headers() {
        let site = site();
        let conf = ConfigRenderer::new(&site)
            .render(&TemplateId::ProxyTls)
            .unwrap();
        assert!(conf.contains("ssl_certificate /etc/letsencrypt/live/example.org/fullchain.pem;"));
        assert!(conf.contains("ssl_certificate_key /etc/letsencrypt/live/example.org/privkey.pem;"));
        assert!(conf.contains("location /donation/ {"));
        assert!(conf.contains("proxy_pass http://127.0.0.1:8000;"));
        assert!(conf.contains("X-Forwarded-Proto $scheme"));
        assert_eq!(conf.matches("listen 443 ssl;").count(), 1);
    }

    #[test]
    fn proxy_tls_serves_static_root_when_configured() {
        let mut site = site();
        site.static_root = Some(PathBuf::from("/srv/www"));
        let conf = ConfigRenderer::new(&site)
            .render(&TemplateId::ProxyTls)
            .unwrap();
        assert!(conf.contains("root /srv/www;"));
        assert_eq!(conf.matches("proxy_pass").count(), 1);
    }

    fn tls_locations(conf: &str) -> usize {
        let tls = &conf[conf.find("listen 443").expect("tls server block")..];
        tls.matches("location / {").count()
    }

    #[test]
    fn proxy_tls_at_root_has_single_root_location() {
        let mut site = site();
        site.location_prefix = "/".into();
        let conf = ConfigRenderer::new(&site)
            .render(&TemplateId::ProxyTls)
            .unwrap();
        assert_eq!(tls_locations(&conf), 1);
        assert_eq!(conf.matches("proxy_pass").count(), 1);

        site.static_root = Some(PathBuf::from("/srv/www"));
        let conf = ConfigRenderer::new(&site)
            .render(&TemplateId::ProxyTls)
            .unwrap();
        assert_eq!(tls_locations(&conf), 1);
        assert!(!conf.contains("root /srv/www;"));
    }

    #[test]
    fn proxy_tls_below_root_adds_root_location() {
        let site = site();
        let conf = ConfigRenderer::new(&site)
            .render(&TemplateId::ProxyTls)
            .unwrap();
        assert_eq!(tls_locations(&conf), 1);
        assert!(conf.contains("location /donation/ {"));
        assert_eq!(conf.matches("proxy_pass").count(), 2);
    }

    #[test]
    fn template_ids_parse() {
        assert_eq!("proxy-tls".parse::<TemplateId>().unwrap(), TemplateId::ProxyTls);
        assert_eq!(
            "file:/tmp/site.tmpl".parse::<TemplateId>().unwrap(),
            TemplateId::File(PathBuf::from("/tmp/site.tmpl"))
        );
        assert!("file:".parse::<TemplateId>().is_err());
        assert!("apache".parse::<TemplateId>().is_err());
    }

    #[test]
    fn file_template_is_read_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.tmpl");
        std::fs::write(&path, "upstream {{upstream}};\n").unwrap();

        let site = site();
        let out = ConfigRenderer::new(&site)
            .render(&TemplateId::File(path))
            .unwrap();
        assert_eq!(out, "upstream http://127.0.0.1:8000;\n");
    }
}
