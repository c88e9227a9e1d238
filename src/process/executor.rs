/*!
 * Program Executor
 * Starts external programs for logical processes and collects their status
 */

use super::launcher::{ProcessContext, StdinPolicy};
use super::io::OutputSink;
use crate::core::limits::EXIT_UNCATEGORIZED;
use crate::core::types::{ExecFailure, ExitStatus};
use std::env;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use tracing::{debug, error, warn};

const TTY_PATH: &str = "/dev/tty";

/// External program started for a logical process, output not yet collected
///
/// Dropping it before `supervise` kills the child, so a process thread that
/// never starts cannot leave an orphan behind.
pub(super) struct Spawned {
    program: String,
    child: Option<Child>,
}

/// Resolve and start `program` with the context's argv, overlay and stdio
///
/// Runs on the launching thread: a missing or unexecutable program is known
/// before the launch returns.
pub(super) fn spawn_program(program: &str, ctx: &ProcessContext) -> Result<Spawned, ExecFailure> {
    let path = resolve(program, ctx).inspect_err(|failure| {
        debug!(program, %failure, "program lookup failed");
    })?;

    let mut cmd = Command::new(&path);
    cmd.args(ctx.args());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.arg0(&ctx.argv()[0]);
    }
    if let Some(overlay) = ctx.overlay() {
        cmd.envs(overlay.iter());
    }

    cmd.stdin(stdin_for(ctx.stdin_policy()));
    let (stdout, stderr) = ctx.sinks();
    cmd.stdout(match stdout {
        OutputSink::Stdout => Stdio::inherit(),
        OutputSink::Null => Stdio::null(),
        _ => Stdio::piped(),
    });
    cmd.stderr(match stderr {
        OutputSink::Stderr => Stdio::inherit(),
        OutputSink::Null => Stdio::null(),
        _ => Stdio::piped(),
    });

    let child = cmd.spawn().map_err(|err| {
        debug!(program, error = %err, "spawn failed");
        ExecFailure::from_io(&err)
    })?;

    Ok(Spawned {
        program: program.to_string(),
        child: Some(child),
    })
}

impl Spawned {
    /// Forward the program's output into the context's sinks and wait for it
    pub(super) fn supervise(mut self, ctx: &ProcessContext) -> ExitStatus {
        let Some(mut child) = self.child.take() else {
            return ExitStatus::Exited(EXIT_UNCATEGORIZED);
        };

        let (stdout, stderr) = ctx.sinks();
        let child_stdout = child.stdout.take();
        let child_stderr = child.stderr.take();
        thread::scope(|scope| {
            if let Some(pipe) = child_stderr {
                scope.spawn(move || forward(pipe, stderr));
            }
            if let Some(pipe) = child_stdout {
                forward(pipe, stdout);
            }
        });

        match child.wait() {
            Ok(status) => ExitStatus::from_std(status),
            Err(err) => {
                error!(program = %self.program, error = %err, "failed to wait for program");
                ExitStatus::Exited(EXIT_UNCATEGORIZED)
            }
        }
    }
}

impl Drop for Spawned {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            warn!(program = %self.program, "killing program that was never supervised");
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

/// Locate the program image the way `execvp` would
fn resolve(program: &str, ctx: &ProcessContext) -> Result<PathBuf, ExecFailure> {
    if program.is_empty() {
        return Err(ExecFailure::NotFound);
    }
    if program.contains('/') {
        return Ok(PathBuf::from(program));
    }
    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    which::which_in(program, ctx.getenv("PATH"), &cwd).map_err(|_| ExecFailure::NotFound)
}

fn stdin_for(policy: StdinPolicy) -> Stdio {
    match policy {
        StdinPolicy::Null => Stdio::null(),
        StdinPolicy::Inherit => Stdio::inherit(),
        StdinPolicy::Terminal => match File::open(Path::new(TTY_PATH)) {
            Ok(tty) => Stdio::from(tty),
            Err(err) => {
                warn!(error = %err, "can't open {}, using /dev/null", TTY_PATH);
                Stdio::null()
            }
        },
    }
}

fn forward(mut pipe: impl Read, mut sink: OutputSink) {
    if let Err(err) = io::copy(&mut pipe, &mut sink) {
        warn!(error = %err, "failed to forward program output");
    }
}
