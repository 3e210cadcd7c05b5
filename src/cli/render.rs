//! Handler for the `render` command.

use serde_json::json;

use crate::cli::{load_config, output, Cli, RenderArgs};
use crate::error::Result;
use crate::render::{ConfigRenderer, TemplateId};

/// Render one template against the site configuration to stdout.
pub fn execute(cli: &Cli, args: &RenderArgs) -> Result<()> {
    let config = load_config(cli, &args.config)?;
    let template: TemplateId = args.template.parse()?;

    let rendered = ConfigRenderer::new(&config.site)
        .with_service(&config.service)
        .render(&template)?;

    if output::is_json() {
        output::emit_json(
            "rendered",
            json!({ "template": template.to_string(), "contents": rendered }),
        );
    } else {
        print!("{rendered}");
    }
    Ok(())
}
