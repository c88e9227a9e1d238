/*!
 * Process Launcher
 *
 * Starts a logical process: allocates an identifier, installs its
 * environment overlay and runs the entry point on a dedicated thread that
 * records the termination status when it returns.
 *
 * External programs are spawned before `launch` returns. A program that
 * cannot be executed is terminated with `ExecFailed` on the launching
 * thread, so the failure is reapable as soon as its pid is known.
 */

use super::env::{self, EnvOverlay};
use super::executor;
use super::io::OutputSink;
use super::table::ProcessTable;
use super::types::Lease;
use crate::core::errors::{ProcessError, ProcessResult};
use crate::core::types::{ExitStatus, Pid};
use crate::monitoring::ProcessSpan;
use nix::sys::signal::Signal;
use std::fmt;
use std::io::{self, Write};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use tracing::{debug, error, info, warn};

/// In-process entry point; the return value is the exit code
pub type Routine = Arc<dyn Fn(&mut ProcessContext) -> i32 + Send + Sync>;

/// What a logical process runs
#[derive(Clone)]
pub enum EntryPoint {
    Routine(Routine),
    /// External program, resolved through the process's `PATH`
    Program(String),
}

impl fmt::Debug for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryPoint::Routine(_) => f.write_str("Routine(..)"),
            EntryPoint::Program(program) => f.debug_tuple("Program").field(program).finish(),
        }
    }
}

/// Standard input of an external program
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StdinPolicy {
    /// Read from `/dev/null`
    #[default]
    Null,
    /// Share the host's standard input
    Inherit,
    /// Reopen the controlling terminal, falling back to null
    Terminal,
}

/// Description of a logical process to launch
#[derive(Debug, Clone)]
pub struct Command {
    entry: EntryPoint,
    argv: Vec<String>,
    overlay: Option<EnvOverlay>,
    stdin: StdinPolicy,
    stdout: Option<OutputSink>,
    stderr: Option<OutputSink>,
}

impl Command {
    /// External program; `argv[0]` is the program name
    pub fn new(program: impl Into<String>) -> Self {
        let program = program.into();
        Self::with_entry(EntryPoint::Program(program.clone()), program)
    }

    /// In-process routine running under `name` as `argv[0]`
    pub fn routine<F>(name: impl Into<String>, routine: F) -> Self
    where
        F: Fn(&mut ProcessContext) -> i32 + Send + Sync + 'static,
    {
        Self::with_entry(EntryPoint::Routine(Arc::new(routine)), name.into())
    }

    pub fn with_entry(entry: EntryPoint, argv0: impl Into<String>) -> Self {
        Self {
            entry,
            argv: vec![argv0.into()],
            overlay: None,
            stdin: StdinPolicy::default(),
            stdout: None,
            stderr: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.argv.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.argv.extend(args.into_iter().map(Into::into));
        self
    }

    /// Bind one variable in the process's overlay
    pub fn env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.overlay
            .get_or_insert_with(EnvOverlay::new)
            .set(name, value);
        self
    }

    /// Replace the whole overlay
    pub fn overlay(mut self, overlay: EnvOverlay) -> Self {
        self.overlay = Some(overlay);
        self
    }

    pub fn stdin(mut self, policy: StdinPolicy) -> Self {
        self.stdin = policy;
        self
    }

    pub fn stdout(mut self, sink: OutputSink) -> Self {
        self.stdout = Some(sink);
        self
    }

    pub fn stderr(mut self, sink: OutputSink) -> Self {
        self.stderr = Some(sink);
        self
    }

    /// Program or routine name (`argv[0]`)
    pub fn name(&self) -> &str {
        &self.argv[0]
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    pub fn entry(&self) -> &EntryPoint {
        &self.entry
    }
}

/// Everything a running logical process can see of itself
pub struct ProcessContext {
    pid: Pid,
    argv: Vec<String>,
    overlay: Option<Arc<EnvOverlay>>,
    stdin: StdinPolicy,
    stdout: OutputSink,
    stderr: OutputSink,
}

impl ProcessContext {
    #[inline]
    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Full argument vector, `argv[0]` included
    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    /// Arguments after `argv[0]`
    pub fn args(&self) -> &[String] {
        &self.argv[1..]
    }

    pub fn overlay(&self) -> Option<&EnvOverlay> {
        self.overlay.as_deref()
    }

    /// Variable lookup through this process's overlay
    pub fn getenv(&self, name: &str) -> Option<String> {
        env::lookup(self.overlay(), name)
    }

    /// Full environment as seen by this process
    pub fn vars(&self) -> Vec<(String, String)> {
        env::merged(self.overlay())
    }

    pub fn stdin_policy(&self) -> StdinPolicy {
        self.stdin
    }

    pub fn stdout(&mut self) -> &mut OutputSink {
        &mut self.stdout
    }

    pub fn stderr(&mut self) -> &mut OutputSink {
        &mut self.stderr
    }

    #[cfg(test)]
    pub(super) fn detached(argv: Vec<String>) -> Self {
        Self {
            pid: crate::core::types::CONTROLLING_PID,
            argv,
            overlay: None,
            stdin: StdinPolicy::Null,
            stdout: OutputSink::Null,
            stderr: OutputSink::Null,
        }
    }

    pub(super) fn sinks(&self) -> (OutputSink, OutputSink) {
        (self.stdout.clone(), self.stderr.clone())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stdout.flush()?;
        self.stderr.flush()
    }
}

/// Entry point after any external program has been started
enum Started {
    Routine(Routine),
    Program(executor::Spawned),
}

/// Launch `command` as a new logical process
///
/// Blocks while the table is exhausted. On thread creation failure the
/// identifier is released before the error is returned.
pub(super) fn launch(
    table: &Arc<ProcessTable>,
    command: Command,
    stack_size: usize,
    default_stdout: &OutputSink,
    default_stderr: &OutputSink,
) -> ProcessResult<Pid> {
    let Command {
        entry,
        argv,
        overlay,
        stdin,
        stdout,
        stderr,
    } = command;

    let lease = table.allocate();
    let pid = lease.pid;

    let overlay = overlay.map(Arc::new);
    if let Some(overlay) = &overlay {
        table.set_overlay(pid, Arc::clone(overlay));
    }
    table.set_name(pid, argv[0].as_str());

    let context = ProcessContext {
        pid,
        argv,
        overlay,
        stdin,
        stdout: stdout.unwrap_or_else(|| default_stdout.clone()),
        stderr: stderr.unwrap_or_else(|| default_stderr.clone()),
    };

    let started = match entry {
        EntryPoint::Routine(routine) => Started::Routine(routine),
        EntryPoint::Program(program) => match executor::spawn_program(&program, &context) {
            Ok(spawned) => Started::Program(spawned),
            Err(failure) => {
                debug!(pid, program = %program, %failure, "exec failed at launch");
                table.terminate(lease, ExitStatus::ExecFailed(failure));
                return Ok(pid);
            }
        },
    };

    let spawned = thread::Builder::new()
        .name(format!("proc-{}", pid))
        .stack_size(stack_size)
        .spawn({
            let table = Arc::clone(table);
            move || process_main(&table, lease, started, context)
        });

    match spawned {
        Ok(_) => {
            info!(pid, "process launched");
            Ok(pid)
        }
        Err(err) => {
            error!(pid, error = %err, "failed to start process thread");
            table.release(pid);
            Err(ProcessError::LaunchFailed {
                pid,
                reason: err.to_string(),
            })
        }
    }
}

/// Body of every logical process thread
fn process_main(table: &ProcessTable, lease: Lease, started: Started, mut ctx: ProcessContext) {
    table.bind(lease, thread::current().id());

    let span = ProcessSpan::new(lease.pid, &ctx.argv[0]);
    let _entered = span.enter();

    let status = match started {
        Started::Routine(routine) => {
            match panic::catch_unwind(AssertUnwindSafe(|| routine(&mut ctx))) {
                Ok(code) => ExitStatus::from_code(code),
                Err(_) => {
                    warn!(pid = lease.pid, "routine panicked");
                    ExitStatus::Signaled(Signal::SIGABRT as i32)
                }
            }
        }
        Started::Program(spawned) => spawned.supervise(&ctx),
    };

    if let Err(err) = ctx.flush() {
        warn!(pid = lease.pid, error = %err, "failed to flush process output");
    }
    span.record_status(status);
    table.terminate(lease, status);
}
