//! Handler for the `plan` command.

use std::path::Path;

use serde_json::json;

use crate::cli::{load_config, output, Cli};
use crate::error::Result;
use crate::plan;

/// Print the phases `deploy` would run, in order.
pub fn execute(cli: &Cli, path: &Path) -> Result<()> {
    let config = load_config(cli, path)?;
    let built = plan::build(&config)?;

    if output::is_json() {
        for (index, phase) in built.plan().iter().enumerate() {
            output::emit_json(
                "phase",
                json!({
                    "step": index + 1,
                    "name": phase.name(),
                    "action": phase.action().as_str(),
                    "params": phase.params(),
                }),
            );
        }
        return Ok(());
    }

    output::section(&format!("Plan for {}", config.site.domain));
    for (index, phase) in built.plan().iter().enumerate() {
        output::field(
            &format!("{:>2}. {}", index + 1, phase.action()),
            format!("{} {}", phase.name(), output::muted(phase.describe())),
        );
    }

    if !built.rendered().is_empty() {
        output::section("Rendered files");
        for file in built.rendered() {
            output::field(&file.template.to_string(), file.path.display());
        }
    }

    Ok(())
}
