//! Plan construction: the standard runbook, or an explicit phase list.
//!
//! Building a plan renders every template it needs up front, so a template
//! error surfaces before any phase has run. The rendered files are written
//! to the staging directory by [`BuiltPlan::write_rendered`] and copied into
//! place by `CopyFile` phases.

use std::path::{Path, PathBuf};

use crate::config::{Config, PhaseConfig};
use crate::domain::{DeploymentPlan, Phase, PhaseAction};
use crate::error::{PlanError, Result};
use crate::probe::ExpectedStatus;
use crate::render::{ConfigRenderer, TemplateId};

/// A template rendered for this deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFile {
    pub template: TemplateId,
    pub path: PathBuf,
    pub contents: String,
}

/// A plan plus the staged files its `CopyFile` phases read.
#[derive(Debug, Clone)]
pub struct BuiltPlan {
    plan: DeploymentPlan,
    rendered: Vec<RenderedFile>,
}

impl BuiltPlan {
    pub fn plan(&self) -> &DeploymentPlan {
        &self.plan
    }

    pub fn rendered(&self) -> &[RenderedFile] {
        &self.rendered
    }

    /// Write rendered files into the staging directory.
    #[allow(clippy::result_large_err)]
    pub fn write_rendered(&self) -> Result<()> {
        for file in &self.rendered {
            if let Some(parent) = file.path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&file.path, &file.contents)?;
        }
        Ok(())
    }
}

/// Build the plan for `config`: its explicit `[[phases]]` when declared,
/// otherwise the standard runbook.
#[allow(clippy::result_large_err)]
pub fn build(config: &Config) -> Result<BuiltPlan> {
    let mut builder = Builder::new(config);
    if config.phases.is_empty() {
        builder.standard()?;
    } else {
        for phase in &config.phases {
            builder.explicit(phase)?;
        }
    }
    builder.finish()
}

struct Builder<'a> {
    config: &'a Config,
    phases: Vec<Phase>,
    rendered: Vec<RenderedFile>,
}

impl<'a> Builder<'a> {
    fn new(config: &'a Config) -> Self {
        Self {
            config,
            phases: Vec::new(),
            rendered: Vec::new(),
        }
    }

    #[allow(clippy::result_large_err)]
    fn finish(self) -> Result<BuiltPlan> {
        Ok(BuiltPlan {
            plan: DeploymentPlan::new(self.phases)?,
            rendered: self.rendered,
        })
    }

    /// Render `template` into the staging directory as `file_name`.
    #[allow(clippy::result_large_err)]
    fn stage(&mut self, template: TemplateId, file_name: &str) -> Result<PathBuf> {
        let contents = ConfigRenderer::new(&self.config.site)
            .with_service(&self.config.service)
            .render(&template)?;
        let path = self.config.runner.staging_dir.join(file_name);
        self.rendered.push(RenderedFile {
            template,
            path: path.clone(),
            contents,
        });
        Ok(path)
    }

    fn push(&mut self, phase: Phase) {
        self.phases.push(phase);
    }

    #[allow(clippy::result_large_err)]
    fn standard(&mut self) -> Result<()> {
        let config = self.config;
        let site = &config.site;
        let service = &config.service;
        let proxy = &config.proxy;
        let manager = service.manager.as_str();

        // install-deps
        let deps = &config.dependencies;
        if !deps.packages.is_empty() {
            let mut args = vec!["install".to_string(), "-y".to_string()];
            args.extend(deps.packages.iter().cloned());
            self.push(Phase::run_command(
                "install-deps/packages",
                &deps.installer,
                &args,
            ));
        }

        // register-service
        let unit = self.stage(TemplateId::ServiceUnit, &format!("{}.service", service.name))?;
        self.push(
            Phase::copy_file("register-service/unit", &unit, &service.unit_path())
                .with_param("mode", "644"),
        );
        self.push(Phase::run_command(
            "register-service/daemon-reload",
            manager,
            &["daemon-reload"],
        ));
        self.push(Phase::run_command(
            "register-service/enable",
            manager,
            &["enable", "--now", service.name.as_str()],
        ));
        self.push(Phase::run_command(
            "register-service/restart",
            manager,
            &["restart", service.name.as_str()],
        ));

        // install-proxy
        let site_file = proxy.site_file(&site.domain);
        let available = proxy.sites_available.join(&site_file);
        let enabled = proxy.sites_enabled.join(&site_file);
        let http = self.stage(TemplateId::ProxyHttp, &format!("{}.http.conf", site.domain))?;
        self.push(Phase::copy_file("install-proxy/http-site", &http, &available));
        self.push(Phase::run_command(
            "install-proxy/enable-site",
            "ln",
            &["-sf".to_string(), path_arg(&available), path_arg(&enabled)],
        ));
        self.push(Phase::run_command(
            "install-proxy/webroot",
            "mkdir",
            &["-p".to_string(), path_arg(&site.webroot)],
        ));
        self.push(Phase::run_command("install-proxy/test", &proxy.binary, &["-t"]));
        self.push(Phase::reload_service(
            "install-proxy/reload",
            manager,
            &proxy.service,
        ));

        // issue-certificate
        let domains: Vec<&str> = site.all_domains().collect();
        let mut certificate =
            Phase::request_certificate("issue-certificate/request", &domains, &site.webroot)
                .with_param("client", config.certificate.client.as_str());
        if let Some(email) = &config.certificate.email {
            certificate = certificate.with_param("email", email.as_str());
        }
        if config.certificate.staging {
            certificate = certificate.with_param("staging", "true");
        }
        self.push(certificate);

        let tls = self.stage(TemplateId::ProxyTls, &format!("{}.tls.conf", site.domain))?;
        self.push(Phase::copy_file("issue-certificate/tls-site", &tls, &available));
        self.push(Phase::run_command(
            "issue-certificate/test",
            &proxy.binary,
            &["-t"],
        ));
        self.push(Phase::reload_service(
            "issue-certificate/reload",
            manager,
            &proxy.service,
        ));

        // verify
        for (index, probe) in config.probes().iter().enumerate() {
            let expected = ExpectedStatus::try_from(probe.expect).map_err(|code| {
                PlanError::InvalidPhase {
                    phase: format!("verify/probe-{}", index + 1),
                    reason: format!("unsupported expected status {code}"),
                }
            })?;
            self.push(Phase::probe(
                format!("verify/probe-{}", index + 1),
                &probe.url,
                expected,
            ));
        }

        Ok(())
    }

    #[allow(clippy::result_large_err)]
    fn explicit(&mut self, declared: &PhaseConfig) -> Result<()> {
        let invalid = |reason: String| PlanError::InvalidPhase {
            phase: declared.name.clone(),
            reason,
        };

        let action: PhaseAction = declared
            .action
            .parse()
            .map_err(|e: crate::error::PhaseError| invalid(e.to_string()))?;

        let mut params = declared.params.clone();

        if let Some(command) = &declared.command {
            if action != PhaseAction::RunCommand {
                return Err(invalid("'command' is only valid for run-command".into()).into());
            }
            let (program, args) = command
                .split_first()
                .ok_or_else(|| invalid("'command' is empty".into()))?;
            params.insert("program".into(), program.clone());
            params.insert("args".into(), serde_json::to_string(args)?);
        }

        if let Some(template) = &declared.template {
            if action != PhaseAction::CopyFile {
                return Err(invalid("'template' is only valid for copy-file".into()).into());
            }
            let id: TemplateId = template.parse()?;
            let file_name = format!("{}.rendered", sanitize(&declared.name));
            let staged = self.stage(id, &file_name)?;
            params.insert("source".into(), path_arg(&staged));
        }

        let phase = Phase::new(declared.name.as_str(), action, params)
            .map_err(|e| invalid(e.to_string()))?;
        self.push(phase);
        Ok(())
    }
}

fn path_arg(path: &Path) -> String {
    path.display().to_string()
}

/// Phase names contain `/`; staging file names must not.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::testkit::config::config_under;

    fn names(built: &BuiltPlan) -> Vec<&str> {
        built.plan().iter().map(Phase::name).collect()
    }

    #[test]
    fn standard_plan_follows_runbook_order() {
        let config = config_under(Path::new("/tmp/sitedeploy-test"));
        let built = build(&config).unwrap();

        assert_eq!(
            names(&built),
            vec![
                "install-deps/packages",
                "register-service/unit",
                "register-service/daemon-reload",
                "register-service/enable",
                "register-service/restart",
                "install-proxy/http-site",
                "install-proxy/enable-site",
                "install-proxy/webroot",
                "install-proxy/test",
                "install-proxy/reload",
                "issue-certificate/request",
                "issue-certificate/tls-site",
                "issue-certificate/test",
                "issue-certificate/reload",
                "verify/probe-1",
                "verify/probe-2",
            ]
        );
        assert_eq!(built.rendered().len(), 3);
    }

    #[test]
    fn standard_plan_skips_empty_package_list() {
        let mut config = config_under(Path::new("/tmp/sitedeploy-test"));
        config.dependencies.packages.clear();
        let built = build(&config).unwrap();
        assert_eq!(names(&built)[0], "register-service/unit");
    }

    #[test]
    fn certificate_phase_covers_all_domains_and_contact() {
        let mut config = config_under(Path::new("/tmp/sitedeploy-test"));
        config.certificate.email = Some("ops@example.org".into());
        let built = build(&config).unwrap();

        let cert = built
            .plan()
            .iter()
            .find(|p| p.action() == PhaseAction::RequestCertificate)
            .unwrap();
        assert_eq!(cert.domains().unwrap(), vec!["example.org", "www.example.org"]);
        assert_eq!(cert.param("email"), Some("ops@example.org"));
        assert_eq!(cert.param("staging"), None);
    }

    #[test]
    fn enable_site_links_available_into_enabled() {
        let config = config_under(Path::new("/srv/t"));
        let built = build(&config).unwrap();
        let link = built
            .plan()
            .iter()
            .find(|p| p.name() == "install-proxy/enable-site")
            .unwrap();
        assert_eq!(
            link.args().unwrap(),
            vec![
                "-sf",
                "/srv/t/sites-available/example.org.conf",
                "/srv/t/sites-enabled/example.org.conf",
            ]
        );
    }

    #[test]
    fn template_errors_surface_at_build_time() {
        let mut config = config_under(Path::new("/tmp/sitedeploy-test"));
        config.service.exec_start.clear();
        assert!(matches!(build(&config), Err(Error::Template(_))));
    }

    #[test]
    fn explicit_phases_replace_standard_plan() {
        let toml = r#"
[site]
domain = "example.org"
upstream = "127.0.0.1:8000"

[runner]
staging_dir = "/tmp/sitedeploy-explicit"

[[phases]]
name = "unit"
action = "copy-file"
template = "service-unit"
params = { destination = "/etc/systemd/system/donation.service" }

[[phases]]
name = "daemon-reload"
action = "run-command"
command = ["systemctl", "daemon-reload"]

[[phases]]
name = "reload"
action = "reload-service"
params = { service = "nginx" }
"#;
        let config = Config::from_toml_str(toml).unwrap();
        let built = build(&config).unwrap();

        assert_eq!(names(&built), vec!["unit", "daemon-reload", "reload"]);
        let unit = &built.plan().phases()[0];
        assert_eq!(
            unit.param("source"),
            Some("/tmp/sitedeploy-explicit/unit.rendered")
        );
        assert_eq!(built.rendered().len(), 1);
        assert_eq!(
            built.plan().phases()[1].args().unwrap(),
            vec!["daemon-reload"]
        );
    }

    #[test]
    fn explicit_phase_with_bad_action_is_rejected() {
        let toml = r#"
[site]
domain = "example.org"
upstream = "127.0.0.1:8000"

[[phases]]
name = "mystery"
action = "teleport"
"#;
        let config = Config::from_toml_str(toml).unwrap();
        match build(&config) {
            Err(Error::Plan(PlanError::InvalidPhase { phase, .. })) => assert_eq!(phase, "mystery"),
            other => panic!("expected invalid phase, got {other:?}"),
        }
    }

    #[test]
    fn write_rendered_creates_staging_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_under(dir.path());
        let built = build(&config).unwrap();
        built.write_rendered().unwrap();

        let unit = std::fs::read_to_string(dir.path().join("staging/donation.service")).unwrap();
        assert!(unit.contains("[Service]"));
        assert!(dir.path().join("staging/example.org.tls.conf").exists());
    }
}
