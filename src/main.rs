mod cli;
mod commands;
mod config;
mod elevation;
mod engine;
mod environment;
mod items;
mod paths;
mod plugins;
mod recommend;
mod runner;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;
use termkit::{LogLevel, LogSink, ProgressStack, StackOptions};

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    /// Running with administrator rights
    pub elevated: bool,
    pub progress: ProgressStack,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    let logger = env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .build();

    let mut sink = LogSink::new(LogLevel::from_verbosity(cli.verbose, cli.quiet));
    if let Some(path) = &cli.log_file {
        sink.set_file(paths::expand(&path.to_string_lossy()));
    }
    let progress = ProgressStack::new(sink, stack_options(cli.quiet));
    termkit::bridge::install(logger, progress.draw_target())?;

    let mut ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        elevated: elevation::is_elevated(),
        progress,
    };

    if needs_windows(&cli.command) {
        environment::validate()?;
    }

    match cli.command {
        Command::Apply(args) => commands::apply::run(&mut ctx, args),
        Command::Test(args) => commands::test::run(&mut ctx, args),
        Command::Status(args) => commands::status::run(&mut ctx, args),
        Command::Profile(args) => commands::profile::run(&mut ctx, args),
        Command::Recommend(args) => commands::recommend::run(&mut ctx, args),
        Command::Plugins(cmd) => commands::plugins::run(&ctx, cmd),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "dotwin", &mut io::stdout());
            Ok(())
        }
    }
}

/// Progress display policy: nothing drawn under `--quiet`
fn stack_options(quiet: bool) -> StackOptions {
    if quiet {
        StackOptions::hidden()
    } else {
        StackOptions::detect()
    }
}

/// Commands that query or change the running system
fn needs_windows(command: &Command) -> bool {
    match command {
        Command::Apply(_) | Command::Test(_) | Command::Status(_) | Command::Profile(_) => true,
        Command::Recommend(args) => args.profile.is_none(),
        Command::Plugins(_) | Command::Completions { .. } => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use termkit::RenderMode;

    #[test]
    fn test_quiet_hides_progress() {
        assert_eq!(stack_options(true).mode, RenderMode::Hidden);
        assert_ne!(stack_options(false).mode, RenderMode::Hidden);
    }

    #[test]
    fn test_saved_profile_skips_environment_check() {
        let cli = Cli::try_parse_from(["dotwin", "recommend", "--profile", "p.json"]).unwrap();
        assert!(!needs_windows(&cli.command));

        let cli = Cli::try_parse_from(["dotwin", "recommend"]).unwrap();
        assert!(needs_windows(&cli.command));
    }
}
