use anyhow::Result;
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

/// Phantom bundle builder.
///
/// Builds the CommonJS, ES module, browser ES module, UMD and experimental
/// bundles of a library from a single entry point.
///
/// EXAMPLES:
///     phantom build                      Build every target
///     phantom build --fail-fast          Stop after the first failed target
///     phantom build --out-dir build      Write bundles under build/
///
/// ENVIRONMENT VARIABLES:
///     PHANTOM_FAIL_FAST  Set to '1' (or 'true', 'yes') to stop after the first failed target
///     PHANTOM_LOG        Log filter (e.g. 'debug', 'phantom_build=trace')
///     NO_COLOR           Set to disable colored output
#[derive(Parser)]
#[command(name = "phantom")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build every target of the project in the current directory
    ///
    /// Reads package.json and the optional phantom.toml, then writes
    /// x/, lib/, es/, dist/ and the declaration directories.
    ///
    /// EXAMPLES:
    ///     phantom build                      Build with phantom.toml settings
    ///     phantom build --sequential         Build one target at a time
    ///     phantom build --timeout 30         Fail targets running over 30s
    ///     phantom build --json               Machine-readable report
    #[command(visible_alias = "b")]
    Build {
        /// Path to package.json
        #[arg(long)]
        manifest: Option<PathBuf>,
        /// Library entry point
        #[arg(long)]
        entry: Option<PathBuf>,
        /// Output directory
        #[arg(long)]
        out_dir: Option<PathBuf>,
        /// Path to phantom.toml
        #[arg(long)]
        config: Option<PathBuf>,
        /// Stop after the first failed target
        #[arg(
            long,
            env = "PHANTOM_FAIL_FAST",
            action = ArgAction::SetTrue,
            value_parser = BoolishValueParser::new()
        )]
        fail_fast: bool,
        /// Build targets one at a time
        #[arg(long)]
        sequential: bool,
        /// Per-target time limit in seconds
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,
        /// JSON output
        #[arg(long)]
        json: bool,
        /// Verbose output
        #[arg(long, short = 'v', conflicts_with = "quiet")]
        verbose: bool,
        /// Quiet output (errors only)
        #[arg(long, short = 'q')]
        quiet: bool,
    },
}

/// Default log filter when `PHANTOM_LOG` is unset
fn default_filter(verbose: bool, quiet: bool) -> &'static str {
    if quiet {
        "error"
    } else if verbose {
        "info,phantom_build=debug"
    } else {
        "warn"
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let filter = EnvFilter::try_from_env("PHANTOM_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose, quiet)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            manifest,
            entry,
            out_dir,
            config,
            fail_fast,
            sequential,
            timeout,
            json,
            verbose,
            quiet,
        } => {
            init_logging(verbose, quiet);
            let args = commands::build::BuildArgs {
                manifest,
                entry,
                out_dir,
                config,
                fail_fast,
                sequential,
                timeout,
                json,
                verbose,
                quiet,
                ..Default::default()
            };
            commands::build::run(args)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_fail_fast_flag() {
        let cli = Cli::try_parse_from(["phantom", "build", "--fail-fast"]).unwrap();
        let Commands::Build { fail_fast, .. } = cli.command;
        assert!(fail_fast);
    }

    #[test]
    fn test_default_filter() {
        assert_eq!(default_filter(false, false), "warn");
        assert_eq!(default_filter(true, false), "info,phantom_build=debug");
        assert_eq!(default_filter(false, true), "error");
    }
}
