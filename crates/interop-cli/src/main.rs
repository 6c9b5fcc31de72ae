use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use interop_core::build::{build_env_from_process, MakeCli};
use interop_core::layout::ScratchLayout;
use interop_core::report::Reporter;
use interop_core::vcs::GitCli;
use interop_core::{Harness, HarnessConfig};

/// Exit status when every executable ran but some decode differed.
const EXIT_MISMATCH: u8 = 1;
/// Exit status for infrastructure failures.
const EXIT_FATAL: u8 = 2;

#[derive(Debug, Parser)]
#[command(name = "interop-versions")]
#[command(
    about = "Check that every released version can decode every other version's output.",
    long_about = "Builds every release tag (and the working tree) for native and 32-bit targets, \
compresses a reference input at each level, and decodes every distinct result with every build.\n\n\
Environment: INTEROP_ROOT, INTEROP_REPO_URL, INTEROP_REFERENCE, INTEROP_GIT, INTEROP_MAKE, RUST_LOG."
)]
struct Cli {
    /// Print every external invocation and its environment.
    #[arg(long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match try_main() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(EXIT_FATAL)
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn try_main() -> Result<ExitCode> {
    let cwd = std::env::current_dir().context("current_dir")?;
    let config = HarnessConfig::from_env(&cwd)?;
    tracing::debug!(?config, "configuration");

    let layout = ScratchLayout::new(&config);
    let git = GitCli::new(config.git.clone(), layout.clone_dir());
    let make = MakeCli::new(config.make.clone());

    let stdout = std::io::stdout();
    let mut reporter = Reporter::new(stdout.lock());
    let outcome = Harness::new(&config, &git, &make, build_env_from_process()).run(&mut reporter)?;

    tracing::info!(report = %outcome.report_path.display(), "report written");
    Ok(if outcome.ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_MISMATCH)
    })
}
