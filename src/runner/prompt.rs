/*!
 * Interactive Confirmation
 * `-p`: ask on the terminal before each command is launched
 */

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use tracing::warn;

const TTY_PATH: &str = "/dev/tty";

/// Source of yes/no answers for prompted runs
pub trait Confirm: Send + Sync {
    /// Ask whether to run the command line already written to `prompt`
    ///
    /// `None` means nobody can be asked; the command then runs as if it had
    /// only been traced.
    fn confirm(&self, prompt: &mut dyn Write) -> Option<bool>;
}

/// Reads answers from the controlling terminal
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalConfirm;

impl Confirm for TerminalConfirm {
    fn confirm(&self, prompt: &mut dyn Write) -> Option<bool> {
        let tty = match File::open(TTY_PATH) {
            Ok(tty) => tty,
            Err(err) => {
                warn!(error = %err, "can't open {}, not prompting", TTY_PATH);
                return None;
            }
        };

        if let Err(err) = prompt.write_all(b"?...").and_then(|_| prompt.flush()) {
            warn!(error = %err, "failed to write prompt");
        }

        let mut response = String::new();
        match BufReader::new(tty).read_line(&mut response) {
            Ok(0) | Err(_) => Some(false),
            Ok(_) => Some(is_affirmative(&response)),
        }
    }
}

/// Whether a response means yes (POSIX locale `^[yY]`)
pub fn is_affirmative(response: &str) -> bool {
    response.starts_with(['y', 'Y'])
}
