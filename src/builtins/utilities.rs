/*!
 * Builtin Utilities
 * Small utilities that run as in-process routines instead of external programs
 */

use crate::process::ProcessContext;
use std::io::{self, Write};

/// `echo [-n] [string ...]`
pub fn echo(ctx: &mut ProcessContext) -> i32 {
    let mut args = ctx.args();
    let newline = match args.first() {
        Some(flag) if flag == "-n" => {
            args = &args[1..];
            false
        }
        _ => true,
    };

    let mut line = args.join(" ");
    if newline {
        line.push('\n');
    }
    status(ctx.stdout().write_all(line.as_bytes()))
}

/// `printenv [name]`
///
/// Without a name, lists every variable visible to the process. With one,
/// prints its value, or exits 1 when it is unset. Options are rejected.
pub fn printenv(ctx: &mut ProcessContext) -> i32 {
    let mut operands = ctx.args();
    match operands.first().map(String::as_str) {
        Some("--") => operands = &operands[1..],
        Some(opt) if opt.len() > 1 && opt.starts_with('-') => {
            let _ = ctx.stderr().write_all(b"usage: printenv [name]\n");
            return 1;
        }
        _ => {}
    }

    let Some(name) = operands.first() else {
        let mut listing = String::new();
        for (name, value) in ctx.vars() {
            listing.push_str(&name);
            listing.push('=');
            listing.push_str(&value);
            listing.push('\n');
        }
        return status(ctx.stdout().write_all(listing.as_bytes()));
    };

    match ctx.getenv(name) {
        Some(value) => status(writeln!(ctx.stdout(), "{}", value)),
        None => 1,
    }
}

pub fn true_(_: &mut ProcessContext) -> i32 {
    0
}

pub fn false_(_: &mut ProcessContext) -> i32 {
    1
}

fn status(written: io::Result<()>) -> i32 {
    match written {
        Ok(()) => 0,
        Err(_) => 1,
    }
}
