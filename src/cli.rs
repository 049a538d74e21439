//! Command-line surface: `serve <bundle-dir> <port>`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Serves an Apple sparsebundle band directory over the NBD wire protocol.
#[derive(Debug, Parser)]
#[command(name = "sparsebundle-nbd", version = env!("CARGO_PKG_VERSION"), about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,

    /// Increases log verbosity; repeat for more (overridden by `RUST_LOG`).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Serve a sparsebundle's band directory over NBD.
    Serve {
        /// Directory containing `Info.plist` and `bands/`.
        bundle_dir: PathBuf,
        /// TCP port to listen on.
        port: u16,
    },
}

/// Picks a `tracing` filter directive from `-v` repeats, absent an explicit
/// `RUST_LOG` override.
pub fn default_log_directive(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_serve_subcommand() {
        let cli = Cli::parse_from(["sparsebundle-nbd", "serve", "/tmp/bundle.sparsebundle", "10809"]);
        let CliCommand::Serve { bundle_dir, port } = cli.command;
        assert_eq!(bundle_dir, PathBuf::from("/tmp/bundle.sparsebundle"));
        assert_eq!(port, 10809);
    }

    #[test]
    fn verbose_flag_raises_filter() {
        assert_eq!(default_log_directive(0), "info");
        assert_eq!(default_log_directive(1), "debug");
        assert_eq!(default_log_directive(2), "trace");
    }
}
