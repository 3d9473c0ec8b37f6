use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use bigfind::app::App;
use bigfind::cli::{Cli, Config};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let config = Config::from_cli(cli).context("failed to build configuration")?;

    let mut app = App::new(config);
    app.run().context("scan failed")?;

    Ok(())
}

fn setup_logging(verbose: bool) {
    let default_filter = if verbose {
        "bigfind=debug,warn"
    } else {
        "bigfind=info,warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
