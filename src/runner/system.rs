use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use super::command;
use super::StepRunner;
use crate::config::Config;
use crate::domain::{Phase, PhaseAction};
use crate::error::{PhaseError, Result};
use crate::probe::HealthVerifier;

/// Runs phases against the real system: filesystem, processes, network.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    command_timeout: Duration,
    verifier: HealthVerifier,
}

impl SystemRunner {
    pub fn new(command_timeout: Duration, verifier: HealthVerifier) -> Self {
        Self {
            command_timeout,
            verifier,
        }
    }

    /// Build from the runner section of the configuration.
    #[allow(clippy::result_large_err)]
    pub fn from_config(config: &Config) -> Result<Self> {
        let verifier = HealthVerifier::new(Duration::from_secs(config.runner.probe_timeout_secs))?;
        Ok(Self::new(
            Duration::from_secs(config.runner.command_timeout_secs),
            verifier,
        ))
    }

    async fn copy_file(&self, phase: &Phase) -> std::result::Result<String, PhaseError> {
        let source = PathBuf::from(phase.require("source")?);
        let destination = PathBuf::from(phase.require("destination")?);

        let contents = tokio::fs::read(&source)
            .await
            .map_err(|e| PhaseError::io(&source, &e))?;

        let parent = match destination.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        match tokio::fs::metadata(&parent).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(PhaseError::Io {
                    path: parent,
                    reason: "destination parent is not a directory".into(),
                })
            }
            Err(e) => return Err(PhaseError::io(&parent, &e)),
        }

        let unchanged = match tokio::fs::read(&destination).await {
            Ok(existing) => existing == contents,
            Err(_) => false,
        };

        let output = if unchanged {
            debug!(destination = %destination.display(), "Destination already up to date");
            "unchanged".to_string()
        } else {
            write_atomically(&destination, &contents).await?;
            format!(
                "copied {} bytes to {}",
                contents.len(),
                destination.display()
            )
        };

        if let Some(mode) = phase.param("mode") {
            let mode = u32::from_str_radix(mode, 8)
                .map_err(|_| PhaseError::invalid(format!("'mode' {mode} is not octal")))?;
            set_mode(&destination, mode).await?;
        }

        Ok(output)
    }

    async fn run_command(&self, phase: &Phase) -> std::result::Result<String, PhaseError> {
        let program = phase.require("program")?;
        let args = phase.args()?;
        let cwd = phase.param("cwd").map(Path::new);
        let output = command::run(program, &args, cwd, self.command_timeout).await?;
        Ok(output.stdout)
    }

    async fn reload_service(&self, phase: &Phase) -> std::result::Result<String, PhaseError> {
        let manager = phase.param("manager").unwrap_or("systemctl");
        let service = phase.require("service")?;
        let args = vec!["reload".to_string(), service.to_string()];
        command::run(manager, &args, None, self.command_timeout).await?;
        Ok(format!("reloaded {service}"))
    }

    async fn request_certificate(&self, phase: &Phase) -> std::result::Result<String, PhaseError> {
        let client = phase.param("client").unwrap_or("certbot");
        let args = certificate_args(phase)?;
        let domains = phase.domains()?.join(",");

        // Spawn failures and timeouts stay process errors: the client never
        // reached the CA.
        let finished = command::wait(client, &args, None, self.command_timeout).await?;
        if finished.status.success() {
            info!(domains = %domains, "Certificate present");
            return Ok(finished.stdout);
        }

        let stderr = finished.stderr_tail();
        Err(PhaseError::Certificate {
            domains,
            detail: if stderr.is_empty() {
                finished.status_text()
            } else {
                format!("{}: {stderr}", finished.status_text())
            },
        })
    }

    async fn probe(&self, phase: &Phase) -> std::result::Result<String, PhaseError> {
        let url = phase.require("url")?;
        let expected = phase.expected_status()?;
        let observed = self.verifier.check(url, expected).await?;
        Ok(format!("HTTP {observed}"))
    }
}

#[async_trait]
impl StepRunner for SystemRunner {
    async fn execute(&self, phase: &Phase) -> std::result::Result<String, PhaseError> {
        match phase.action() {
            PhaseAction::CopyFile => self.copy_file(phase).await,
            PhaseAction::RunCommand => self.run_command(phase).await,
            PhaseAction::ReloadService => self.reload_service(phase).await,
            PhaseAction::RequestCertificate => self.request_certificate(phase).await,
            PhaseAction::Probe => self.probe(phase).await,
        }
    }

    fn name(&self) -> &'static str {
        "system"
    }
}

/// ACME client arguments for a `RequestCertificate` phase.
///
/// `--keep-until-expiring` makes a repeated request a no-op while the
/// existing certificate is still valid.
pub fn certificate_args(phase: &Phase) -> std::result::Result<Vec<String>, PhaseError> {
    let webroot = phase.require("webroot")?;
    let mut args: Vec<String> = vec![
        "certonly".into(),
        "--webroot".into(),
        "-w".into(),
        webroot.into(),
    ];
    for domain in phase.domains()? {
        args.push("-d".into());
        args.push(domain);
    }
    args.extend(
        [
            "--non-interactive",
            "--agree-tos",
            "--keep-until-expiring",
        ]
        .map(String::from),
    );
    match phase.param("email") {
        Some(email) => {
            args.push("-m".into());
            args.push(email.into());
        }
        None => args.push("--register-unsafely-without-email".into()),
    }
    if phase.flag("staging")? {
        args.push("--staging".into());
    }
    Ok(args)
}

async fn write_atomically(destination: &Path, contents: &[u8]) -> std::result::Result<(), PhaseError> {
    let file_name = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "sitedeploy".into());
    let staging = destination.with_file_name(format!(".{file_name}.sitedeploy-tmp"));

    tokio::fs::write(&staging, contents)
        .await
        .map_err(|e| PhaseError::io(&staging, &e))?;
    // The replacement keeps the permissions of the file it replaces.
    if let Ok(existing) = tokio::fs::metadata(destination).await {
        if let Err(e) = tokio::fs::set_permissions(&staging, existing.permissions()).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(PhaseError::io(&staging, &e));
        }
    }
    if let Err(e) = tokio::fs::rename(&staging, destination).await {
        let _ = tokio::fs::remove_file(&staging).await;
        return Err(PhaseError::io(destination, &e));
    }
    Ok(())
}

#[cfg(unix)]
async fn set_mode(path: &Path, mode: u32) -> std::result::Result<(), PhaseError> {
    use std::os::unix::fs::PermissionsExt;

    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .await
        .map_err(|e| PhaseError::io(path, &e))
}

#[cfg(not(unix))]
async fn set_mode(_path: &Path, _mode: u32) -> std::result::Result<(), PhaseError> {
    Ok(())
}
