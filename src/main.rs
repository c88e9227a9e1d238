/*!
 * xargs - Main Entry Point
 *
 * Builds and runs command lines from standard input, launching each one as
 * a thread-backed logical process.
 */

use clap::Parser;
use std::io;
use std::process::ExitCode;
use threadproc::core::limits::EXIT_USAGE;
use threadproc::{init_tracing, EnvOverlay, Runner, RunnerConfig, RunnerError, RunnerResult};
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "xargs", version)]
#[command(about = "Construct argument lists and execute utility", long_about = None)]
struct Cli {
    /// Input items are terminated by NUL instead of blanks and newlines
    #[arg(short = '0')]
    null: bool,

    /// Treat this argument as logical end of input
    #[arg(short = 'E', value_name = "EOFSTR")]
    eof_str: Option<String>,

    /// Run once per input line, replacing REPLSTR in utility arguments
    #[arg(short = 'I', value_name = "REPLSTR", overrides_with = "splice")]
    insert: Option<String>,

    /// Insert the batch in place of the utility argument equal to REPLSTR
    #[arg(short = 'J', value_name = "REPLSTR", overrides_with = "insert")]
    splice: Option<String>,

    /// Use at most NUMBER non-empty input lines per command
    #[arg(short = 'L', value_name = "NUMBER", overrides_with = "max_args")]
    max_lines: Option<usize>,

    /// Use at most NUMBER arguments per command
    #[arg(short = 'n', value_name = "NUMBER", overrides_with = "max_lines")]
    max_args: Option<usize>,

    /// Reopen the terminal as standard input of each command
    #[arg(short = 'o')]
    open_tty: bool,

    /// Ask on the terminal before running each command
    #[arg(short = 'p')]
    prompt: bool,

    /// Run up to MAXPROCS commands at a time
    #[arg(short = 'P', value_name = "MAXPROCS", default_value_t = 1)]
    max_procs: usize,

    /// Replace in at most REPLACEMENTS utility arguments (negative: all)
    #[arg(short = 'R', value_name = "REPLACEMENTS", allow_negative_numbers = true)]
    replacements: Option<i64>,

    /// Limit each command line to SIZE bytes
    #[arg(short = 's', value_name = "SIZE")]
    max_size: Option<usize>,

    /// Echo each command to standard error before running it
    #[arg(short = 't')]
    trace: bool,

    /// Exit if a command line would not fit in the size limit
    #[arg(short = 'x')]
    exit_on_overflow: bool,

    /// Bind NAME=VALUE in the environment of every command
    #[arg(long = "setenv", value_name = "NAME=VALUE")]
    setenv: Vec<String>,

    /// Utility to run and its leading arguments (default: echo)
    #[arg(trailing_var_arg = true)]
    utility: Vec<String>,
}

impl Cli {
    fn into_config(self) -> RunnerResult<RunnerConfig> {
        let mut builder = RunnerConfig::builder()
            .max_procs(self.max_procs)
            .null_separated(self.null)
            .trace(self.trace)
            .prompt(self.prompt)
            .exit_on_overflow(self.exit_on_overflow)
            .open_tty(self.open_tty)
            .utility(self.utility);

        if let Some(n) = self.max_args {
            builder = builder.max_args(n);
        }
        if let Some(n) = self.max_lines {
            builder = builder.max_lines(n);
        }
        if let Some(size) = self.max_size {
            builder = builder.max_size(size);
        }
        if let Some(eof) = self.eof_str {
            builder = builder.eof_str(eof);
        }
        if let Some(replstr) = self.insert {
            builder = builder.insert(replstr);
        }
        if let Some(replstr) = self.splice {
            builder = builder.splice(replstr);
        }
        if let Some(n) = self.replacements {
            builder = builder.replacements(n);
        }
        if !self.setenv.is_empty() {
            if let Some(bad) = self.setenv.iter().find(|e| !e.contains('=')) {
                return Err(RunnerError::usage(format!(
                    "--setenv expects NAME=VALUE, got '{}'",
                    bad
                )));
            }
            builder = builder.overlay(EnvOverlay::from_envp(&self.setenv));
        }
        builder.build()
    }
}

fn run(cli: Cli) -> RunnerResult<i32> {
    let config = cli.into_config()?;
    debug!(?config, "runner configured");
    let runner = Runner::new(config)?;
    let report = runner.run(io::stdin().lock())?;
    Ok(report.exit_code())
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // help and version go to stdout and succeed
            let code = if err.use_stderr() { EXIT_USAGE } else { 0 };
            let _ = err.print();
            return ExitCode::from(code as u8);
        }
    };

    init_tracing("warn");

    match run(cli) {
        Ok(code) => ExitCode::from(code as u8),
        Err(err) => {
            eprintln!("xargs: {}", err);
            ExitCode::from(err.exit_code() as u8)
        }
    }
}
