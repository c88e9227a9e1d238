/*!
 * Runner Configuration
 *
 * Everything one runner invocation needs, independent of how it was
 * obtained. The `xargs` binary fills it from the command line; library
 * users build it directly or deserialize it.
 */

use crate::core::errors::{RunnerError, RunnerResult};
use crate::core::limits::{
    DEFAULT_ARG_SIZE, DEFAULT_MAX_ARGS, DEFAULT_MAX_PROCS, DEFAULT_REPLACEMENTS, DEFAULT_UTILITY,
};
use crate::process::EnvOverlay;
use serde::{Deserialize, Serialize};

/// How batch arguments are combined with the utility's own arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplaceMode {
    /// `-I`: one input line per command, substituted into utility arguments
    Insert(String),
    /// `-J`: batch inserted in place of the utility argument equal to this
    Splice(String),
}

impl ReplaceMode {
    pub fn replstr(&self) -> &str {
        match self {
            ReplaceMode::Insert(s) | ReplaceMode::Splice(s) => s,
        }
    }
}

/// Options for one runner invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct RunnerConfig {
    /// Concurrency ceiling (`-P`)
    pub max_procs: usize,
    /// Input arguments per command (`-n`); `None` means the default cap
    pub max_args: Option<usize>,
    /// Non-empty input lines per command (`-L`)
    pub max_lines: Option<usize>,
    /// Byte budget of one command line (`-s`)
    pub max_size: Option<usize>,
    /// Logical end-of-input marker (`-E`)
    pub eof_str: Option<String>,
    pub replace: Option<ReplaceMode>,
    /// Utility arguments rewritten by `-I` (`-R`); negative is unlimited
    pub replacements: Option<i64>,
    /// NUL is the only separator (`-0`)
    pub null_separated: bool,
    /// Echo each command line to stderr before launching (`-t`)
    pub trace: bool,
    /// Ask for confirmation on the terminal before each launch (`-p`)
    pub prompt: bool,
    /// Fail instead of splitting when the size budget runs out first (`-x`)
    pub exit_on_overflow: bool,
    /// Reopen the terminal as the command's stdin (`-o`)
    pub open_tty: bool,
    /// Utility and its leading arguments; empty means `echo`
    pub utility: Vec<String>,
    /// Variables bound for every launched command
    pub env: Option<EnvOverlay>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_procs: DEFAULT_MAX_PROCS,
            max_args: None,
            max_lines: None,
            max_size: None,
            eof_str: None,
            replace: None,
            replacements: None,
            null_separated: false,
            trace: false,
            prompt: false,
            exit_on_overflow: false,
            open_tty: false,
            utility: Vec::new(),
            env: None,
        }
    }
}

impl RunnerConfig {
    pub fn builder() -> RunnerConfigBuilder {
        RunnerConfigBuilder::new()
    }

    /// Reject option combinations the runner cannot honor
    pub fn validate(&self) -> RunnerResult<()> {
        if self.max_procs == 0 {
            return Err(RunnerError::usage("max. processes must be >0"));
        }
        if self.max_args == Some(0) {
            return Err(RunnerError::usage("illegal argument count"));
        }
        if self.replacements.is_some() && !self.is_insert() {
            return Err(RunnerError::usage("-R may only be used with -I"));
        }
        if self.exit_on_overflow && self.max_args.is_none() {
            return Err(RunnerError::usage("-x may only be used with -n"));
        }
        if let Some(mode) = &self.replace {
            if mode.replstr().is_empty() {
                return Err(RunnerError::usage("replstr may not be empty"));
            }
        }
        if self.utility.first().is_some_and(|u| u.is_empty()) {
            return Err(RunnerError::usage("utility name may not be empty"));
        }
        Ok(())
    }

    #[inline]
    pub fn is_insert(&self) -> bool {
        matches!(self.replace, Some(ReplaceMode::Insert(_)))
    }

    /// Whether the user named a utility rather than defaulting to `echo`
    #[inline]
    pub fn has_utility(&self) -> bool {
        !self.utility.is_empty()
    }

    /// Utility argv, defaulted
    pub fn utility_argv(&self) -> Vec<String> {
        if self.utility.is_empty() {
            vec![DEFAULT_UTILITY.to_string()]
        } else {
            self.utility.clone()
        }
    }

    pub fn effective_max_args(&self) -> usize {
        self.max_args.unwrap_or(DEFAULT_MAX_ARGS)
    }

    /// `-I` forces one line per command
    pub fn effective_max_lines(&self) -> Option<usize> {
        if self.is_insert() {
            Some(1)
        } else {
            self.max_lines
        }
    }

    pub fn effective_max_size(&self) -> usize {
        self.max_size.unwrap_or(DEFAULT_ARG_SIZE)
    }

    /// `-I` and `-L` both imply `-x`
    pub fn effective_exit_on_overflow(&self) -> bool {
        self.exit_on_overflow || self.is_insert() || self.max_lines.is_some()
    }

    /// Replacement budget for `-I`; zero when not inserting
    pub fn effective_replacements(&self) -> i64 {
        match (self.is_insert(), self.replacements) {
            (false, _) => 0,
            (true, None | Some(0)) => DEFAULT_REPLACEMENTS,
            (true, Some(n)) => n,
        }
    }
}

/// Consuming builder for [`RunnerConfig`]
#[derive(Debug, Clone, Default)]
pub struct RunnerConfigBuilder {
    config: RunnerConfig,
}

impl RunnerConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_procs(mut self, n: usize) -> Self {
        self.config.max_procs = n;
        self
    }

    /// `-n`; overrides an earlier `-L`
    pub fn max_args(mut self, n: usize) -> Self {
        self.config.max_args = Some(n);
        self.config.max_lines = None;
        self
    }

    /// `-L`; overrides an earlier `-n`, and zero turns line counting off
    pub fn max_lines(mut self, n: usize) -> Self {
        self.config.max_lines = (n > 0).then_some(n);
        self.config.max_args = None;
        self
    }

    pub fn max_size(mut self, bytes: usize) -> Self {
        self.config.max_size = Some(bytes);
        self
    }

    pub fn eof_str(mut self, eof: impl Into<String>) -> Self {
        self.config.eof_str = Some(eof.into());
        self
    }

    pub fn insert(mut self, replstr: impl Into<String>) -> Self {
        self.config.replace = Some(ReplaceMode::Insert(replstr.into()));
        self
    }

    pub fn splice(mut self, replstr: impl Into<String>) -> Self {
        self.config.replace = Some(ReplaceMode::Splice(replstr.into()));
        self
    }

    pub fn replacements(mut self, n: i64) -> Self {
        self.config.replacements = Some(n);
        self
    }

    pub fn null_separated(mut self, on: bool) -> Self {
        self.config.null_separated = on;
        self
    }

    pub fn trace(mut self, on: bool) -> Self {
        self.config.trace = on;
        self
    }

    /// `-p`; echoes like `-t` when no terminal can be opened
    pub fn prompt(mut self, on: bool) -> Self {
        self.config.prompt = on;
        self
    }

    pub fn exit_on_overflow(mut self, on: bool) -> Self {
        self.config.exit_on_overflow = on;
        self
    }

    pub fn open_tty(mut self, on: bool) -> Self {
        self.config.open_tty = on;
        self
    }

    pub fn utility<I, S>(mut self, argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.utility = argv.into_iter().map(Into::into).collect();
        self
    }

    pub fn env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config
            .env
            .get_or_insert_with(EnvOverlay::new)
            .set(name, value);
        self
    }

    pub fn overlay(mut self, overlay: EnvOverlay) -> Self {
        self.config.env = Some(overlay);
        self
    }

    /// Validate and return the configuration
    pub fn build(self) -> RunnerResult<RunnerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
