/*!
 * Batch Assembly
 *
 * Splits the input stream into arguments and groups them into command
 * batches under the count, line and byte-size limits.
 *
 * Tokenizing rules:
 * - blanks and newlines separate arguments; empty arguments are dropped
 *   unless quoted
 * - single and double quotes group, but never span a newline
 * - a backslash outside quotes escapes the next byte
 * - with NUL separation, NUL is the only separator and quoting is off
 *
 * For line counting, empty lines are ignored and a line ending in a blank
 * continues onto the next one.
 */

use crate::core::errors::{RunnerError, RunnerResult};
use std::io::{BufReader, Bytes, Read};
use tracing::trace;

/// Limits governing one batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchLimits {
    /// Arguments per batch
    pub max_args: usize,
    /// Counted input lines per batch
    pub max_lines: Option<usize>,
    /// Bytes available for arguments, one terminator each included
    pub capacity: usize,
    /// Argument that ends input
    pub eof_str: Option<String>,
    pub null_separated: bool,
    /// Running out of bytes before `max_args` is an error instead of a split
    pub exit_on_overflow: bool,
    /// Whole-line mode: the end marker is only honored at line end
    pub whole_lines: bool,
}

/// One group of input arguments dispatched as one command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    pub args: Vec<String>,
}

impl Batch {
    /// Arguments joined back into the input line they came from
    ///
    /// A blank precedes each argument once the line is non-empty, so an empty
    /// argument in the middle leaves two blanks and a leading one vanishes.
    pub fn line(&self) -> String {
        let mut line = String::new();
        for arg in &self.args {
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(arg);
        }
        line
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }
}

/// Pulls batches out of a byte stream
pub struct BatchAssembler<R: Read> {
    input: Bytes<BufReader<R>>,
    limits: BatchLimits,
    /// Argument under construction; survives a split
    current: Vec<u8>,
    in_single: bool,
    in_double: bool,
    was_quoted: bool,
    last_was_newline: bool,
    last_was_blank: bool,
    finished: bool,
}

/// Per-batch accumulation
#[derive(Default)]
struct Pending {
    args: Vec<String>,
    /// Bytes used by completed arguments, terminators included
    used: usize,
    lines: usize,
}

/// What the end of an argument means for the batch
enum Boundary {
    Continue,
    Dispatch,
    DispatchLast,
    Finish,
}

impl<R: Read> BatchAssembler<R> {
    pub fn new(input: R, limits: BatchLimits) -> Self {
        Self {
            input: BufReader::new(input).bytes(),
            limits,
            current: Vec::new(),
            in_single: false,
            in_double: false,
            was_quoted: false,
            last_was_newline: true,
            last_was_blank: false,
            finished: false,
        }
    }

    /// Next batch, or `None` once input is exhausted
    pub fn next_batch(&mut self) -> RunnerResult<Option<Batch>> {
        if self.finished {
            return Ok(None);
        }
        let mut pending = Pending::default();

        loop {
            let Some(byte) = self.input.next().transpose()? else {
                return self.at_eof(pending);
            };
            let mut last_was_backslashed = false;
            let mut effective = byte;

            let boundary = match byte {
                b' ' | b'\t' => {
                    if byte == b' ' {
                        self.last_was_blank = true;
                    }
                    if self.in_single || self.in_double || self.limits.null_separated {
                        self.add_byte(&mut pending, byte)?
                    } else {
                        self.end_argument(&mut pending, false)?
                    }
                }
                b'\0' if self.limits.null_separated => {
                    pending.lines += 1;
                    self.end_argument(&mut pending, false)?
                }
                b'\n' if !self.limits.null_separated => {
                    if self.last_was_newline {
                        // empty line
                        self.last_was_blank = false;
                        continue;
                    }
                    if !self.last_was_blank {
                        pending.lines += 1;
                    }
                    self.last_was_newline = true;
                    self.check_quotes()?;
                    self.end_argument(&mut pending, false)?
                }
                b'\'' if !self.in_double && !self.limits.null_separated => {
                    self.in_single = !self.in_single;
                    self.was_quoted = true;
                    Boundary::Continue
                }
                b'"' if !self.in_single && !self.limits.null_separated => {
                    self.in_double = !self.in_double;
                    self.was_quoted = true;
                    Boundary::Continue
                }
                b'\\' if !self.limits.null_separated => {
                    last_was_backslashed = true;
                    if !self.in_single && !self.in_double {
                        effective = self
                            .input
                            .next()
                            .transpose()?
                            .ok_or_else(|| RunnerError::input("backslash at EOF"))?;
                    }
                    self.add_byte(&mut pending, effective)?
                }
                _ => self.add_byte(&mut pending, byte)?,
            };

            self.after_byte(effective, last_was_backslashed);
            if let Boundary::Continue = boundary {
                continue;
            }
            if let Some(batch) = self.settle(boundary, pending) {
                return Ok(Some(batch));
            }
            if self.finished {
                return Ok(None);
            }
            pending = Pending::default();
        }
    }

    /// Turn a boundary into a batch, or start over when there is nothing to run
    fn settle(&mut self, boundary: Boundary, pending: Pending) -> Option<Batch> {
        match boundary {
            Boundary::Continue => unreachable!("settle is only called on a boundary"),
            Boundary::Finish => {
                self.finished = true;
                None
            }
            Boundary::DispatchLast => {
                self.finished = true;
                non_empty(pending)
            }
            Boundary::Dispatch => non_empty(pending),
        }
    }

    fn after_byte(&mut self, byte: u8, backslashed: bool) {
        if byte != b' ' {
            self.last_was_blank = false;
        }
        if byte != b'\n' || backslashed {
            self.last_was_newline = false;
        }
    }

    fn check_quotes(&self) -> RunnerResult<()> {
        if self.in_single || self.in_double {
            return Err(RunnerError::input("unterminated quote"));
        }
        Ok(())
    }

    fn at_eof(&mut self, mut pending: Pending) -> RunnerResult<Option<Batch>> {
        self.finished = true;
        if pending.args.is_empty() && self.current.is_empty() && !self.was_quoted {
            return Ok(None);
        }
        self.check_quotes()?;
        match self.end_argument(&mut pending, true)? {
            Boundary::Finish => Ok(None),
            _ => Ok(non_empty(pending)),
        }
    }

    /// Close the argument under construction and apply the batch limits
    fn end_argument(&mut self, pending: &mut Pending, at_eof: bool) -> RunnerResult<Boundary> {
        let found_eof = self.matches_eof_str();
        if found_eof && pending.args.is_empty() {
            trace!("end-of-input marker reached");
            return Ok(Boundary::Finish);
        }

        if (!self.current.is_empty() || self.was_quoted) && !found_eof {
            let arg = String::from_utf8_lossy(&self.current).into_owned();
            pending.used += arg.len() + 1;
            pending.args.push(arg);
        }
        self.current.clear();
        self.was_quoted = false;

        let limits = &self.limits;
        let args_full = pending.args.len() >= limits.max_args;
        let bytes_full = pending.used >= limits.capacity;
        let lines_full = limits.max_lines.is_some_and(|max| pending.lines >= max);

        if at_eof || found_eof {
            return Ok(Boundary::DispatchLast);
        }
        if args_full || bytes_full || lines_full {
            if limits.exit_on_overflow && !args_full && bytes_full {
                return Err(RunnerError::input("insufficient space for arguments"));
            }
            return Ok(Boundary::Dispatch);
        }
        Ok(Boundary::Continue)
    }

    fn matches_eof_str(&self) -> bool {
        let Some(eof) = self.limits.eof_str.as_deref().filter(|e| !e.is_empty()) else {
            return false;
        };
        if self.limits.whole_lines && !self.last_was_newline {
            return false;
        }
        self.current == eof.as_bytes()
    }

    /// Append one byte, splitting the batch when the byte budget runs out
    fn add_byte(&mut self, pending: &mut Pending, byte: u8) -> RunnerResult<Boundary> {
        if pending.used + self.current.len() + 1 < self.limits.capacity {
            self.current.push(byte);
            return Ok(Boundary::Continue);
        }
        if pending.args.is_empty() {
            return Err(RunnerError::input("insufficient space for argument"));
        }
        if self.limits.exit_on_overflow {
            return Err(RunnerError::input("insufficient space for arguments"));
        }
        // the partial argument moves to the next batch
        self.current.push(byte);
        Ok(Boundary::Dispatch)
    }
}

fn non_empty(pending: Pending) -> Option<Batch> {
    if pending.args.is_empty() {
        None
    } else {
        Some(Batch { args: pending.args })
    }
}
