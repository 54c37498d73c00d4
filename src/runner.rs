use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, error, info, warn};

use crate::cli::{self, Cli};
use crate::config::{self, ConfigError, ConfigResolver};
use crate::dispatch::{CommandDispatcher, DispatchOptions, DispatchResult};
use crate::lifecycle::Lifecycle;

/// Runs the flags in `app`. Failures are logged, never returned: the process
/// exits 0 on every path.
pub fn run(app: Cli) {
    let ctx = CliContext::from(&app);
    if let Err(err) = execute(&ctx) {
        report_failure(&err);
        println!();
        println!("{}", cli::usage());
    }
}

fn execute(ctx: &CliContext) -> Result<()> {
    ctx.apply_chdir()?;
    let cwd = ctx.working_directory()?;
    let mut resolver = ConfigResolver::new();

    if ctx.init {
        handle_init(&cwd, ctx.force)?;
    }

    if ctx.build {
        warn!(
            "--build was given but the `{}` lifecycle is not dispatched by this command",
            Lifecycle::Build.as_str()
        );
    }

    if ctx.start {
        let config = resolver.resolve(&cwd)?;
        info!(path = %ConfigResolver::config_path(&cwd), "Found configuration");
        debug!("{}", config.summary());
        handle_start(ctx, &mut resolver, &cwd);
    }

    Ok(())
}

fn handle_init(cwd: &Utf8Path, force: bool) -> Result<()> {
    let path = ConfigResolver::config_path(cwd);
    config::write_example_config(&path, force)?;
    if force {
        info!("Overwrote config at {}", path);
    } else {
        info!("Wrote example config to {}", path);
    }
    Ok(())
}

/// Reloads the config so edits since the first resolution are picked up, then
/// dispatches `start`. Errors stop here instead of falling through to usage.
fn handle_start(ctx: &CliContext, resolver: &mut ConfigResolver, cwd: &Utf8Path) {
    let path = ConfigResolver::config_path(cwd);
    if let Some(previous) = resolver.cached(&path) {
        debug!(fields = ?previous.field_names(), "reloading configuration");
    }

    let config = match resolver.resolve(cwd) {
        Ok(config) => config,
        Err(err) => {
            error!(%path, "Error starting project: {:#}", anyhow::Error::from(err));
            return;
        }
    };

    info!("Starting the app");
    debug!("Received configuration in start:\n{}", config.summary());

    let dispatcher = CommandDispatcher::new(DispatchOptions {
        dry_run: ctx.dry_run,
        working_directory: Some(cwd.to_owned()),
    });
    report_dispatch(&dispatcher.dispatch(&config, Lifecycle::Start.as_str()));
}

fn report_dispatch(result: &DispatchResult) {
    match result {
        DispatchResult::Dispatched { lifecycle } => {
            debug!("`{}` script completed", lifecycle);
        }
        DispatchResult::NoScriptFound {
            lifecycle,
            available,
        } => {
            let available = if available.is_empty() {
                "<none>".to_owned()
            } else {
                available.join(", ")
            };
            warn!(
                "No `{}` script found in config (available fields: {})",
                lifecycle, available
            );
        }
        DispatchResult::ExecutionError { lifecycle, cause } => {
            error!("Error running `{}` script: {:#}", lifecycle, cause);
        }
    }
}

fn report_failure(err: &anyhow::Error) {
    match err.downcast_ref::<ConfigError>() {
        Some(config_err @ ConfigError::NotFound { .. }) => warn!("{}", config_err),
        Some(config_err) => error!(path = %config_err.path(), "{:#}", err),
        None => error!("{:#}", err),
    }
}

#[derive(Clone, Debug)]
struct CliContext {
    start: bool,
    build: bool,
    init: bool,
    force: bool,
    chdir: Option<PathBuf>,
    dry_run: bool,
}

impl CliContext {
    fn apply_chdir(&self) -> Result<()> {
        if let Some(path) = &self.chdir {
            std::env::set_current_dir(path)
                .with_context(|| format!("changing directory to {}", path.display()))?;
        }
        Ok(())
    }

    fn working_directory(&self) -> Result<Utf8PathBuf> {
        let cwd = std::env::current_dir().context("determining current directory")?;
        Utf8PathBuf::from_path_buf(cwd).map_err(|_| anyhow!("working directory must be valid UTF-8"))
    }
}

impl From<&Cli> for CliContext {
    fn from(cli: &Cli) -> Self {
        Self {
            start: cli.start,
            build: cli.build,
            init: cli.init,
            force: cli.force,
            chdir: cli.chdir.clone(),
            dry_run: cli.dry_run,
        }
    }
}
