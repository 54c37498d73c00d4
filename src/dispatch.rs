use std::process::{Command as ProcessCommand, ExitStatus};
use std::time::Instant;

use anyhow::{Context, Result, bail};
use camino::Utf8PathBuf;
use tracing::{debug, info};

use crate::config::Configuration;
use crate::lifecycle::{Script, environment};

/// Outcome of a single dispatch. None of these variants abort the process.
#[derive(Debug)]
pub enum DispatchResult {
    Dispatched {
        lifecycle: String,
    },
    NoScriptFound {
        lifecycle: String,
        available: Vec<String>,
    },
    ExecutionError {
        lifecycle: String,
        cause: anyhow::Error,
    },
}

#[derive(Clone, Debug, Default)]
pub struct DispatchOptions {
    pub dry_run: bool,
    /// Directory lifecycle commands run in; the process directory when unset.
    pub working_directory: Option<Utf8PathBuf>,
}

pub struct CommandDispatcher {
    options: DispatchOptions,
}

impl CommandDispatcher {
    pub fn new(options: DispatchOptions) -> Self {
        Self { options }
    }

    pub fn dispatch(&self, config: &Configuration, lifecycle: &str) -> DispatchResult {
        let Some(script) = config.get(lifecycle).and_then(Script::from_value) else {
            return DispatchResult::NoScriptFound {
                lifecycle: lifecycle.to_owned(),
                available: config.field_names().into_iter().map(str::to_owned).collect(),
            };
        };

        match self.invoke(config, lifecycle, &script) {
            Ok(()) => DispatchResult::Dispatched {
                lifecycle: lifecycle.to_owned(),
            },
            Err(cause) => DispatchResult::ExecutionError {
                lifecycle: lifecycle.to_owned(),
                cause,
            },
        }
    }

    fn invoke(&self, config: &Configuration, lifecycle: &str, script: &Script) -> Result<()> {
        let commands = script
            .render(config)
            .with_context(|| format!("rendering `{lifecycle}` script"))?;
        let env = environment(config);

        let total = commands.len();
        for (idx, command) in commands.iter().enumerate() {
            info!("[{}/{}] {} :: {}", idx + 1, total, lifecycle, command);

            if self.options.dry_run {
                info!("    (dry-run) skipped");
                continue;
            }

            let start = Instant::now();
            let status = self.run_shell(command, &env)?;
            if !status.success() {
                bail!("command `{}` {}", command, describe_failure(status));
            }
            debug!("[ok] {} (completed in {:.2?})", command, start.elapsed());
        }

        Ok(())
    }

    fn run_shell(&self, command: &str, env: &[(String, String)]) -> Result<ExitStatus> {
        let mut process = shell(command);
        process.envs(env.iter().map(|(k, v)| (k, v)));
        if let Some(dir) = &self.options.working_directory {
            process.current_dir(dir);
        }
        process
            .status()
            .with_context(|| format!("executing `{}`", command))
    }
}

fn describe_failure(status: ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("failed with exit code {code}"),
        None => "was terminated by signal".to_owned(),
    }
}

fn shell(command: &str) -> ProcessCommand {
    if cfg!(windows) {
        let mut process = ProcessCommand::new("cmd");
        process.args(["/C", command]);
        process
    } else {
        let mut process = ProcessCommand::new("/bin/sh");
        process.args(["-c", command]);
        process
    }
}
