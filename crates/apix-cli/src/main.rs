use anyhow::Context;
use apix_config::ApixConfig;
use clap::Parser;

mod cli;
mod pipeline;
mod report;

fn main() {
    if let Err(error) = run() {
        eprintln!("apix error: {error:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ApixConfig::load_from(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => ApixConfig::load_with_dotenv().context("failed to load apix config")?,
    };
    init_tracing(cli.quiet, cli.verbose, &config.log.level)?;

    let args = cli.command.build_args();
    args.apply_overrides(&mut config.builder);
    tracing::debug!(?config.builder, "builder config resolved");

    let model = pipeline::build(&args.code_model, &args.typesystem, config.builder)?;

    match &cli.command {
        cli::Commands::Summary(_) => report::output(&report::Summary::new(&model), cli.format),
        cli::Commands::Rejects(_) => {
            report::output(&report::RejectReport::new(model.rejects()), cli.format)
        }
        cli::Commands::Diagnostics(_) => {
            report::output(&report::DiagnosticsReport::new(&model), cli.format)
        }
    }
}

/// `APIX_LOG` wins over the flags, which win over `log.level` from config.
fn init_tracing(quiet: bool, verbose: bool, configured: &str) -> anyhow::Result<()> {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        configured
    };

    let filter = tracing_subscriber::EnvFilter::try_from_env("APIX_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}
