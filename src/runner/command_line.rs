/*!
 * Command Line Assembly
 * Combines the utility's own arguments with a batch
 */

use super::batch::Batch;
use super::config::{ReplaceMode, RunnerConfig};
use crate::core::limits::REPLACE_MAX;
use tracing::warn;

/// Utility arguments plus the rule for merging a batch into them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    /// Utility name and arguments, `-J` marker removed
    argv: Vec<String>,
    /// Index in `argv` where `-J` splices the batch
    splice_at: Option<usize>,
    /// `-I` marker and replacement budget
    insert: Option<(String, i64)>,
}

impl CommandTemplate {
    pub fn from_config(config: &RunnerConfig) -> Self {
        let mut argv = config.utility_argv();
        let mut splice_at = None;
        let mut insert = None;

        match &config.replace {
            Some(ReplaceMode::Splice(marker)) => {
                if let Some(idx) = argv.iter().skip(1).position(|a| a == marker) {
                    argv.remove(idx + 1);
                    splice_at = Some(idx + 1);
                }
            }
            // a defaulted `echo` has no arguments to substitute into
            Some(ReplaceMode::Insert(marker)) if config.has_utility() => {
                insert = Some((marker.clone(), config.effective_replacements()));
            }
            _ => {}
        }

        Self {
            argv,
            splice_at,
            insert,
        }
    }

    /// Utility name (`argv[0]`)
    pub fn utility(&self) -> &str {
        &self.argv[0]
    }

    /// Bytes the utility's own arguments take from the size budget
    pub fn fixed_cost(&self) -> usize {
        self.argv.iter().map(|a| a.len() + 1).sum()
    }

    /// Full argument vector for one batch
    pub fn build(&self, batch: &Batch) -> Vec<String> {
        if let Some((marker, budget)) = &self.insert {
            return self.substituted(marker, *budget, &batch.line());
        }

        let mut argv = Vec::with_capacity(self.argv.len() + batch.len());
        match self.splice_at {
            Some(idx) => {
                argv.extend_from_slice(&self.argv[..idx]);
                argv.extend(batch.args.iter().cloned());
                argv.extend_from_slice(&self.argv[idx..]);
            }
            None => {
                argv.extend_from_slice(&self.argv);
                argv.extend(batch.args.iter().cloned());
            }
        }
        argv
    }

    fn substituted(&self, marker: &str, budget: i64, line: &str) -> Vec<String> {
        let mut remaining = budget;
        let mut argv = Vec::with_capacity(self.argv.len());
        argv.push(self.argv[0].clone());

        for arg in &self.argv[1..] {
            if remaining != 0 && arg.contains(marker) {
                argv.push(substitute(arg, marker, line, REPLACE_MAX));
                if remaining > 0 {
                    remaining -= 1;
                }
            } else {
                argv.push(arg.clone());
            }
        }
        argv
    }
}

/// Replace every occurrence of `marker` in `arg` with `replacement`
///
/// A result longer than `max_len` bytes is discarded and `arg` is returned
/// unchanged.
pub fn substitute(arg: &str, marker: &str, replacement: &str, max_len: usize) -> String {
    let replaced = arg.replace(marker, replacement);
    if replaced.len() > max_len {
        warn!(
            arg,
            max_len, "command line cannot be assembled, too long; argument left unreplaced"
        );
        return arg.to_string();
    }
    replaced
}
