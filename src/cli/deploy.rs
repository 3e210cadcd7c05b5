//! Handler for the `deploy` command.

use async_trait::async_trait;
use serde_json::json;
use tokio::signal;
use tracing::{info, warn};

use crate::cli::{load_config, output, Cli, DeployArgs};
use crate::domain::Phase;
use crate::error::{PhaseError, Result};
use crate::orchestrator::{Orchestrator, RunReport};
use crate::plan;
use crate::runner::{DryRunRunner, StepRunner, SystemRunner};

/// Execute the deploy command.
pub async fn execute(cli: &Cli, args: &DeployArgs) -> Result<()> {
    let config = load_config(cli, &args.config)?;
    output::header(env!("CARGO_PKG_VERSION"));

    let built = plan::build(&config)?;

    let runner: Box<dyn StepRunner> = if args.dry_run {
        info!("Dry-run mode enabled - no changes will be made");
        Box::new(DryRunRunner)
    } else {
        if !is_root() {
            output::warning("not running as root; privileged phases will likely fail");
        }
        built.write_rendered()?;
        Box::new(SystemRunner::from_config(&config)?)
    };

    output::section(if args.dry_run {
        "Deploying (dry run)"
    } else {
        "Deploying"
    });
    output::field("Site", &config.site.domain);
    output::field("Phases", built.plan().len());

    let orchestrator = Orchestrator::new(ProgressRunner { inner: runner });
    let cancel = orchestrator.cancel_handle();
    let ctrl_c = tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; stopping after the current phase");
            cancel.cancel();
        }
    });

    let report = orchestrator.run(built.plan()).await;
    ctrl_c.abort();

    print_summary(&report, args.dry_run);
    report.into_result().map(|_| ())
}

fn print_summary(report: &RunReport, dry_run: bool) {
    if output::is_json() {
        for result in report.log() {
            output::emit_json("phase", json!(result.summary()));
        }
        output::emit_json(
            "report",
            json!({
                "run_id": report.run_id().to_string(),
                "state": report.state(),
                "executed": report.log().len(),
            }),
        );
        return;
    }

    output::section("Result");
    output::field("Run", report.run_id());
    output::field("State", report.state());
    output::field("Executed", report.log().len());
    if report.succeeded() {
        output::success("Deployment succeeded");
    }
    if dry_run {
        output::note("Dry run: nothing on this host was changed");
    }
}

/// Shows a spinner per phase around the wrapped runner.
struct ProgressRunner {
    inner: Box<dyn StepRunner>,
}

#[async_trait]
impl StepRunner for ProgressRunner {
    async fn execute(&self, phase: &Phase) -> std::result::Result<String, PhaseError> {
        let pb = output::phase_spinner(phase);
        let result = self.inner.execute(phase).await;
        output::finish_phase(&pb, phase, &result);
        result
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

fn is_root() -> bool {
    #[cfg(unix)]
    {
        // SAFETY: geteuid has no preconditions and cannot fail.
        unsafe { libc::geteuid() == 0 }
    }
    #[cfg(not(unix))]
    {
        false
    }
}
