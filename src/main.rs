use clap::Parser;
use tracing_subscriber::EnvFilter;

use sparsebundle_nbd::cli::{default_log_directive, Cli, CliCommand};

#[tokio::main(flavor = "current_thread")]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_log_directive(cli.verbose)));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let CliCommand::Serve { bundle_dir, port } = cli.command;

    match sparsebundle_nbd::serve(&bundle_dir, port).await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(?err, "server exited with an error");
            std::process::ExitCode::FAILURE
        }
    }
}
