//! Handler for the `check` command.

use std::path::Path;

use crate::cli::{load_config, output, Cli};
use crate::config::ACME_EMAIL_ENV;
use crate::error::Result;
use crate::plan;

/// Validate the configuration and every template the plan needs.
pub fn execute(cli: &Cli, path: &Path) -> Result<()> {
    let config = load_config(cli, path)?;
    let built = plan::build(&config)?;

    output::section("Configuration Check");
    output::field("Config", path.display());
    output::success("Configuration file is valid");

    output::section("Site");
    output::field("Domain", &config.site.domain);
    if !config.site.alt_domains.is_empty() {
        output::field("Alternates", config.site.alt_domains.join(", "));
    }
    output::field("Upstream", config.site.upstream_url());
    output::field("Prefix", &config.site.location_prefix);
    if let Some(cert) = config.site.cert_path() {
        output::field("Certificate", cert.display());
    }
    if let Some(key) = config.site.cert_key_path() {
        output::field("Key", key.display());
    }

    output::section("Plan");
    output::field("Service", config.service.unit_path().display());
    output::field("Phases", built.plan().len());
    output::field("Templates", built.rendered().len());
    output::success("All templates render");

    if config.phases.is_empty() && config.certificate.email.is_none() {
        output::warning(&format!(
            "no ACME contact email (set certificate.email or {ACME_EMAIL_ENV})"
        ));
    }
    if config.certificate.staging {
        output::warning("certificates will come from the CA staging environment");
    }

    Ok(())
}
