//! cli
//!
//! Command-line interface layer.
//!
//! # Responsibilities
//!
//! - Parse arguments and load configuration
//! - Initialise logging
//! - Build the real collaborators (git, transport, forge) and hand them to
//!   the [`crate::engine`]
//! - Publish the report and map the outcome to an exit code
//!
//! # Exit Codes
//!
//! - `0`: fast-forward possible (check only) or applied
//! - `1`: anything else that produced a report
//! - `2`: configuration or usage error; no report, no network I/O

pub mod args;

pub use args::Cli;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::core::config::Config;
use crate::engine::{Outcome, Runner, Stage};
use crate::event::EventContext;
use crate::forge::github::GitHubForge;
use crate::forge::Forge;
use crate::git::{Git, GitCli, GitError};
use crate::ui::report::{render, Report, ReportContext};
use crate::ui::sinks::{publish, Sinks};

/// Exit code for configuration and usage errors.
pub const EXIT_CONFIG: i32 = 2;

/// Run the CLI application and return the process exit code.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> i32 {
    let cli = Cli::parse_args();
    let lookup = |name: &str| std::env::var(name).ok();

    let loaded = cli
        .overrides()
        .and_then(|overrides| Config::load(cli.config.as_deref(), &lookup, overrides));
    let loaded = match loaded {
        Ok(loaded) => loaded,
        Err(e) => {
            init_logging(false);
            error!(error = %e, "configuration rejected");
            eprintln!("error: {}", e);
            return EXIT_CONFIG;
        }
    };

    init_logging(loaded.config.debug);
    for warning in &loaded.warnings {
        warn!(path = %warning.path.display(), "{}", warning.message);
    }
    if let Some(source) = &loaded.source {
        info!(path = %source.display(), "loaded config");
    }

    match execute(&cli, &loaded.config) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            1
        }
    }
}

/// Install the stderr subscriber. `RUST_LOG` wins over `debug`.
fn init_logging(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // A second call (config error path, then tests) must not panic.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn execute(cli: &Cli, config: &Config) -> Result<i32> {
    let rt = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    Ok(rt.block_on(execute_async(cli, config)))
}

async fn execute_async(cli: &Cli, config: &Config) -> i32 {
    let sinks = Sinks {
        step_summary: cli.step_summary.clone(),
        output: cli.output.clone(),
    };
    let token = cli.token.clone().unwrap_or_default();

    let event = match EventContext::from_path(
        &cli.event_name,
        &cli.event_path,
        cli.repository.as_deref(),
    ) {
        Ok(event) => event,
        Err(e) => {
            error!(error = %e, "unusable event");
            let outcome = Outcome::Aborted {
                stage: Stage::Event,
                reason: e.to_string(),
            };
            let report = render(&outcome, &ReportContext::default());
            emit(&report, &sinks, None, config).await;
            return outcome.exit_code();
        }
    };

    let forge = match GitHubForge::from_full_name(token.clone(), &event.repository) {
        Some(forge) => forge
            .with_api_base(&cli.api_url)
            .with_timeout(config.network_timeout),
        None => {
            let outcome = Outcome::Aborted {
                stage: Stage::Event,
                reason: format!("'{}' is not an owner/name repository", event.repository),
            };
            let report = render(&outcome, &ReportContext::default());
            emit(&report, &sinks, None, config).await;
            return outcome.exit_code();
        }
    };

    let git = match open_store(cli) {
        Ok(git) => git,
        Err(e) => {
            let outcome = Outcome::Aborted {
                stage: Stage::Resolving,
                reason: format!("cannot use local repository: {}", e),
            };
            let context = ReportContext {
                actor: Some(event.actor.login.clone()),
                trigger_url: event.trigger_url.clone(),
                repository: Some(event.repository.clone()),
                ..ReportContext::default()
            };
            let report = render(&outcome, &context);
            emit(&report, &sinks, Some((&forge as &dyn Forge, event.pr_number)), config).await;
            return outcome.exit_code();
        }
    };
    let transport = GitCli::new(git.git_dir(), Some(token), config.network_timeout);

    let run = Runner::new(&git, &transport, &forge, config)
        .run(&event)
        .await;
    let report = render(&run.outcome, &run.context);
    emit(&report, &sinks, Some((&forge as &dyn Forge, event.pr_number)), config).await;

    run.outcome.exit_code()
}

/// The local object store: `--repo`, else the enclosing checkout, else a
/// bare scratch repository under `$RUNNER_TEMP`.
fn open_store(cli: &Cli) -> Result<Git, GitError> {
    if let Some(path) = &cli.repo {
        return Git::open_or_init(path);
    }
    match Git::open(Path::new(".")) {
        Ok(git) => Ok(git),
        Err(GitError::NotARepo { .. }) => {
            let scratch = Cli::scratch_path(std::env::var_os("RUNNER_TEMP").map(PathBuf::from));
            info!(path = %scratch.display(), "no checkout; using scratch repository");
            Git::open_or_init(&scratch)
        }
        Err(e) => Err(e),
    }
}

/// Print the report and send it to every sink.
async fn emit(report: &Report, sinks: &Sinks, target: Option<(&dyn Forge, u64)>, config: &Config) {
    println!("{}", report.to_markdown());
    let publication = publish(report, sinks, target, config.comment).await;
    info!(comment = ?publication.comment, "report published");
}
