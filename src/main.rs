use clap::Parser;
use sitedeploy::cli::{self, diagnostic, output, Cli};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let _ = dotenvy::dotenv();
    let _ = rustls::crypto::ring::default_provider().install_default();

    let cli = Cli::parse();
    output::configure(output::OutputConfig::new(cli.json, cli.quiet));

    if let Err(e) = cli::execute(&cli).await {
        match diagnostic::for_config_error(cli.config_path(), &e) {
            Some(report) if !cli.json => eprintln!("{:?}", miette::Report::new(report)),
            _ => output::error(&e.to_string()),
        }
        std::process::exit(1);
    }
}
