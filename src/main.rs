use color_eyre::Result;
use cure_sync::cli::{parse_args, run_cli_command, CliCommand};
use tracing_subscriber::EnvFilter;

/// Log to stderr so command output on stdout stays clean.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("cure_sync=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let command = parse_args(std::env::args());

    // Handle --version and --help before any initialization
    if matches!(command, CliCommand::Version | CliCommand::Help) {
        return run_cli_command(command).await;
    }

    color_eyre::install()?;
    init_tracing();

    run_cli_command(command).await
}
