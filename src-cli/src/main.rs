use clap::Parser;
use incidentdash_lib::cli::Cli;
use incidentdash_lib::DEFAULT_LOG_FILTER;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let mut stdout = std::io::stdout().lock();

    if let Err(e) = incidentdash_lib::run(cli, &mut stdout) {
        eprintln!("Error: {e}");
        if let Some(details) = &e.details {
            eprintln!("  {details}");
        }
        std::process::exit(1);
    }
}
