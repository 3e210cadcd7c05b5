//! Canonical test configurations.

use std::path::Path;

use crate::config::{Config, SiteConfig};

/// `example.org` proxied to a local gunicorn, one alternate name.
pub fn site() -> SiteConfig {
    SiteConfig::new("example.org", "127.0.0.1:8000").with_alt_domains(["www.example.org"])
}

/// Full configuration for [`site`], with every installation directory
/// redirected below `root` so nothing outside it is touched.
pub fn config_under(root: &Path) -> Config {
    let mut config = Config {
        site: site(),
        ..Config::default()
    };
    config.site.webroot = root.join("webroot");
    config.service.unit_dir = root.join("systemd");
    config.proxy.sites_available = root.join("sites-available");
    config.proxy.sites_enabled = root.join("sites-enabled");
    config.runner.staging_dir = root.join("staging");
    config
}
