use std::ffi::OsString;
use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use tracing::warn;

/// Flags for running lifecycle scripts from `tool.config.toml`.
#[derive(Parser, Debug, Default)]
#[command(
    name = "tool",
    version,
    about = "Run lifecycle scripts defined in tool.config.toml"
)]
pub struct Cli {
    /// Starts the app.
    #[arg(long)]
    pub start: bool,
    /// Builds the app (accepted but not dispatched yet).
    #[arg(long)]
    pub build: bool,
    /// Write an example tool.config.toml into the working directory.
    #[arg(long)]
    pub init: bool,
    /// Overwrite an existing config when used with --init.
    #[arg(long, requires = "init")]
    pub force: bool,
    #[arg(short = 'C', long = "chdir")]
    pub chdir: Option<PathBuf>,
    #[arg(short = 'n', long = "dry-run")]
    pub dry_run: bool,
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
}

pub fn parse() -> Result<Cli, clap::Error> {
    parse_from(std::env::args_os())
}

pub fn parse_from<I, T>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    Cli::try_parse_from(args)
}

pub fn usage() -> String {
    Cli::command().render_help().to_string()
}

/// Help and version requests print as usual; anything else is a warning followed
/// by the usage text. Never exits the process.
pub fn report_parse_error(err: &clap::Error) {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            let _ = err.print();
        }
        _ => {
            let rendered = err.to_string();
            let message = rendered
                .lines()
                .next()
                .unwrap_or_default()
                .trim_start_matches("error: ");
            warn!("{}", message);
            println!();
            println!("{}", usage());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_and_build_flags_parse() {
        let cli = parse_from(["tool", "--start", "--build", "-vv"]).unwrap();
        assert!(cli.start);
        assert!(cli.build);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn unknown_flag_is_a_parse_error() {
        let err = parse_from(["tool", "--publish"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);
    }

    #[test]
    fn force_requires_init() {
        assert!(parse_from(["tool", "--force"]).is_err());
        assert!(parse_from(["tool", "--init", "--force"]).unwrap().force);
    }

    #[test]
    fn usage_lists_lifecycle_flags() {
        let text = usage();
        assert!(text.contains("--start"));
        assert!(text.contains("--build"));
    }

    #[test]
    fn clap_definition_is_consistent() {
        Cli::command().debug_assert();
    }
}
