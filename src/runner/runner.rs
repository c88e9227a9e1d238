/*!
 * Bounded Command Runner
 *
 * Launches one logical process per batch while keeping at most `max_procs`
 * of them active, and folds their statuses into one outcome.
 *
 * After every launch, finished processes are reaped without blocking; at
 * the ceiling the runner blocks until one of them terminates. At end of
 * input it drains whatever is still running.
 *
 * With `-p` every command line is confirmed first; declined commands are
 * skipped without being launched.
 */

use super::batch::{BatchAssembler, BatchLimits};
use super::command_line::CommandTemplate;
use super::config::RunnerConfig;
use super::prompt::{Confirm, TerminalConfirm};
use crate::builtins::Builtins;
use crate::core::errors::{RunnerError, RunnerResult};
use crate::core::limits::EXIT_COMMAND_FAILED;
use crate::core::types::{ExitStatus, Pid};
use crate::monitoring::generate_trace_id;
use crate::process::{Command, OutputSink, ProcessManager, StdinPolicy, WaitMode, WaitTarget};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::sync::Arc;
use tracing::{debug, info, info_span, warn};

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    /// Every command exited 0
    Success,
    /// At least one command exited with 1..=254
    CommandFailed,
    /// A command was signaled or exited 255; nothing further was dispatched
    Aborted { pid: Pid, status: ExitStatus },
}

/// Summary of one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub outcome: Outcome,
    /// Commands launched
    pub launched: usize,
    /// Most commands active at once
    pub peak_active: usize,
    /// Commands that exited non-zero
    pub failures: usize,
}

impl RunReport {
    /// Process exit code for this outcome
    pub fn exit_code(&self) -> i32 {
        match self.outcome {
            Outcome::Success => 0,
            Outcome::CommandFailed | Outcome::Aborted { .. } => EXIT_COMMAND_FAILED,
        }
    }
}

/// Bookkeeping for one invocation
struct RunnerState {
    ceiling: usize,
    /// Launched by this run and not yet reaped, with their utility names
    active: AHashMap<Pid, String>,
    launched: usize,
    peak_active: usize,
    failures: usize,
}

impl RunnerState {
    fn new(ceiling: usize) -> Self {
        Self {
            ceiling,
            active: AHashMap::new(),
            launched: 0,
            peak_active: 0,
            failures: 0,
        }
    }

    fn record_launch(&mut self, pid: Pid, utility: &str) {
        self.active.insert(pid, utility.to_string());
        self.launched += 1;
        self.peak_active = self.peak_active.max(self.active.len());
    }

    fn report(&self, outcome: Outcome) -> RunReport {
        RunReport {
            outcome,
            launched: self.launched,
            peak_active: self.peak_active,
            failures: self.failures,
        }
    }
}

/// Runs batches from an input stream through a process manager
pub struct Runner {
    config: RunnerConfig,
    template: CommandTemplate,
    limits: BatchLimits,
    manager: ProcessManager,
    builtins: Builtins,
    confirm: Arc<dyn Confirm>,
}

impl Runner {
    /// Validate `config` and prepare a runner with the standard builtins
    pub fn new(config: RunnerConfig) -> RunnerResult<Self> {
        config.validate()?;
        let template = CommandTemplate::from_config(&config);

        let capacity = config
            .effective_max_size()
            .checked_sub(template.fixed_cost())
            .filter(|&c| c > 0)
            .ok_or_else(|| RunnerError::usage("insufficient space for command"))?;

        let limits = BatchLimits {
            max_args: config.effective_max_args(),
            max_lines: config.effective_max_lines(),
            capacity,
            eof_str: config.eof_str.clone(),
            null_separated: config.null_separated,
            exit_on_overflow: config.effective_exit_on_overflow(),
            whole_lines: config.is_insert(),
        };

        Ok(Self {
            config,
            template,
            limits,
            manager: ProcessManager::new(),
            builtins: Builtins::standard(),
            confirm: Arc::new(TerminalConfirm),
        })
    }

    /// Launch through `manager` instead of a private one
    ///
    /// The runner reaps ANY process of the manager, so it should not be
    /// shared with unrelated launches while a run is in progress.
    pub fn with_manager(mut self, manager: ProcessManager) -> Self {
        self.manager = manager;
        self
    }

    pub fn with_builtins(mut self, builtins: Builtins) -> Self {
        self.builtins = builtins;
        self
    }

    /// Answer `-p` prompts from `confirm` instead of the terminal
    pub fn with_confirm(mut self, confirm: impl Confirm + 'static) -> Self {
        self.confirm = Arc::new(confirm);
        self
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn manager(&self) -> &ProcessManager {
        &self.manager
    }

    /// Concurrency ceiling, bounded by the identifiers the table can issue
    fn ceiling(&self) -> usize {
        let issuable = self.manager.table().capacity() - 1;
        if self.config.max_procs > issuable {
            warn!(
                requested = self.config.max_procs,
                issuable, "ceiling exceeds the process table; clamping"
            );
        }
        self.config.max_procs.min(issuable)
    }

    /// Consume `input` and run every batch it yields
    pub fn run<R: Read>(&self, input: R) -> RunnerResult<RunReport> {
        let run_id = generate_trace_id();
        let span = info_span!("run", run_id = %run_id, utility = self.template.utility());
        let _entered = span.enter();

        let mut state = RunnerState::new(self.ceiling());
        let mut batches = BatchAssembler::new(input, self.limits.clone());

        while let Some(batch) = batches.next_batch()? {
            let argv = self.template.build(&batch);
            if (self.config.trace || self.config.prompt) && !self.announce(&argv) {
                debug!("command declined");
                continue;
            }

            let pid = self.manager.spawn(self.command(argv))?;
            state.record_launch(pid, self.template.utility());
            debug!(pid, active = state.active.len(), "batch dispatched");

            if let Some(outcome) = self.reap(&mut state, false)? {
                return Ok(state.report(outcome));
            }
        }

        if let Some(outcome) = self.reap(&mut state, true)? {
            return Ok(state.report(outcome));
        }

        let outcome = if state.failures > 0 {
            Outcome::CommandFailed
        } else {
            Outcome::Success
        };
        info!(launched = state.launched, failures = state.failures, "run complete");
        Ok(state.report(outcome))
    }

    fn command(&self, argv: Vec<String>) -> Command {
        let mut argv = argv.into_iter();
        let utility = argv.next().unwrap_or_default();
        let mut command = Command::with_entry(self.builtins.resolve(&utility), utility)
            .args(argv)
            .stdin(if self.config.open_tty {
                StdinPolicy::Terminal
            } else {
                StdinPolicy::Null
            });
        if let Some(overlay) = &self.config.env {
            command = command.overlay(overlay.clone());
        }
        command
    }

    /// Echo the command line and, under `-p`, ask whether to run it
    fn announce(&self, argv: &[String]) -> bool {
        let mut sink = self.manager.stderr_sink().clone();
        let echo = |sink: &mut OutputSink, bytes: &[u8]| {
            if let Err(err) = sink.write_all(bytes) {
                warn!(error = %err, "failed to echo command line");
            }
        };

        echo(&mut sink, argv.join(" ").as_bytes());
        if self.config.prompt {
            if let Some(answer) = self.confirm.confirm(&mut sink) {
                return answer;
            }
        }
        echo(&mut sink, b"\n");
        true
    }

    /// Reap finished commands
    ///
    /// Blocks while the ceiling is reached, or until nothing is active when
    /// `drain` is set. Returns an outcome only when the run must stop.
    fn reap(&self, state: &mut RunnerState, drain: bool) -> RunnerResult<Option<Outcome>> {
        while !state.active.is_empty() {
            let mode = if drain || state.active.len() >= state.ceiling {
                WaitMode::Blocking
            } else {
                WaitMode::NonBlocking
            };

            let Some((pid, status)) = self.manager.wait_for(WaitTarget::Any, mode)? else {
                break;
            };
            let Some(utility) = state.active.remove(&pid) else {
                debug!(pid, "reaped a process this run did not launch");
                continue;
            };

            match status {
                ExitStatus::ExecFailed(failure) => {
                    self.abandon(state);
                    return Err(RunnerError::Exec { utility, failure });
                }
                status if status.is_abnormal() => {
                    warn!(pid, %status, utility = %utility, "command terminated abnormally; stopping");
                    self.abandon(state);
                    return Ok(Some(Outcome::Aborted { pid, status }));
                }
                status if !status.success() => {
                    debug!(pid, %status, "command failed");
                    state.failures += 1;
                }
                _ => {}
            }
        }
        Ok(None)
    }

    fn abandon(&self, state: &RunnerState) {
        if !state.active.is_empty() {
            warn!(
                outstanding = state.active.len(),
                "leaving running commands unreaped"
            );
        }
    }
}
