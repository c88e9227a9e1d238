/*!
 * System Limits and Constants
 *
 * Centralized location for process-table sizing, argument budgets and
 * reserved exit codes. Grouped by domain.
 *
 * - Values marked [POSIX] follow the conventions of the xargs/wait contracts
 * - Values marked [PERF] only affect throughput
 */

// =============================================================================
// PROCESS TABLE
// =============================================================================

/// Number of slots in the identifier table
/// Slot 0 belongs to the controlling thread, so 127 identifiers are issuable
pub const PROCESS_TABLE_CAPACITY: usize = 128;

/// Smallest table that can still issue one identifier
pub const MIN_TABLE_CAPACITY: usize = 2;

/// Stack size for logical process threads (2MB)
/// [PERF] Matches the std default; routines are shallow
pub const PROCESS_STACK_SIZE: usize = 2 * 1024 * 1024;

// =============================================================================
// EXIT CODES
// =============================================================================

/// Utility exit value treated as an uncategorized failure
/// [POSIX] xargs stops dispatching when a utility exits with 255
pub const EXIT_UNCATEGORIZED: i32 = 255;

/// Some invocation exited non-zero, or the run was aborted
pub const EXIT_COMMAND_FAILED: i32 = 1;

/// Invalid command-line options or configuration
pub const EXIT_USAGE: i32 = 124;

/// Malformed input stream (quotes, escapes, argument space)
pub const EXIT_INPUT: i32 = 125;

/// Utility found but could not be executed, or no thread could be started
/// [POSIX] 126
pub const EXIT_CANNOT_EXECUTE: i32 = 126;

/// Utility not found
/// [POSIX] 127
pub const EXIT_NOT_FOUND: i32 = 127;

/// Offset added to a signal number when folding it into an exit code
pub const SIGNAL_EXIT_OFFSET: i32 = 128;

// =============================================================================
// ARGUMENT BUDGETS
// =============================================================================

/// Default cap on arguments read from input per command
pub const DEFAULT_MAX_ARGS: usize = 5000;

/// Assumed ARG_MAX of the host (256KB)
pub const ARG_MAX: usize = 256 * 1024;

/// Headroom kept below ARG_MAX
/// [POSIX] ARG_MAX - 2K caused E2BIG in practice, so 4K is reserved
pub const ARG_HEADROOM: usize = 4 * 1024;

/// Default byte budget for one command line
pub const DEFAULT_ARG_SIZE: usize = ARG_MAX - ARG_HEADROOM;

/// Maximum length of an argument after -I substitution
pub const REPLACE_MAX: usize = 255;

/// Default number of utility arguments rewritten by -I
pub const DEFAULT_REPLACEMENTS: i64 = 5;

/// Default concurrency ceiling (-P)
pub const DEFAULT_MAX_PROCS: usize = 1;

/// Utility run when none is given on the command line
pub const DEFAULT_UTILITY: &str = "echo";
