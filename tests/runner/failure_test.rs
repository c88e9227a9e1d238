/*!
 * Failure Handling Tests
 * Exit codes for failed, aborted and unlaunchable commands
 */

use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use threadproc::core::types::ExecFailure;
use threadproc::runner::Outcome;
use threadproc::{
    Builtins, ExitStatus, OutputSink, ProcessError, ProcessManager, Runner, RunnerConfig,
    RunnerError,
};

fn quiet_manager() -> ProcessManager {
    ProcessManager::builder()
        .with_stdout(OutputSink::Null)
        .with_stderr(OutputSink::Null)
        .build()
        .unwrap()
}

fn counting(code: i32, calls: Arc<AtomicUsize>) -> Builtins {
    let mut builtins = Builtins::standard();
    builtins.register("counted", move |_| {
        calls.fetch_add(1, Ordering::SeqCst);
        code
    });
    builtins
}

#[test]
fn test_missing_command_stops_with_127() {
    let config = RunnerConfig::builder()
        .max_args(1)
        .utility(["threadproc-missing-utility"])
        .build()
        .unwrap();
    let runner = Runner::new(config).unwrap().with_manager(quiet_manager());

    let err = runner.run("a b c".as_bytes()).unwrap_err();
    assert_eq!(err.exit_code(), 127);
    assert!(matches!(
        err,
        RunnerError::Exec { ref utility, failure: ExecFailure::NotFound }
            if utility == "threadproc-missing-utility"
    ));
    // no further batch was launched after the failure
    assert_eq!(runner.manager().live(), 0);
}

#[test]
fn test_missing_command_stops_dispatch_with_parallel_ceiling() {
    let config = RunnerConfig::builder()
        .max_procs(4)
        .max_args(1)
        .utility(["threadproc-missing-utility"])
        .build()
        .unwrap();
    let runner = Runner::new(config).unwrap().with_manager(quiet_manager());

    let err = runner.run("a b c d e f g h".as_bytes()).unwrap_err();
    assert_eq!(err.exit_code(), 127);
    assert_eq!(runner.manager().live(), 0);
    // identifiers are issued in order, so only pid 1 was ever launched
    let next = runner.manager().table().try_allocate().unwrap();
    assert_eq!(next.pid, 2);
}

#[cfg(target_pointer_width = "64")]
#[test]
fn test_thread_launch_failure_is_126() {
    let manager = ProcessManager::builder()
        .with_stdout(OutputSink::Null)
        .with_stderr(OutputSink::Null)
        .with_stack_size(1 << 50)
        .build()
        .unwrap();
    let runner = Runner::new(RunnerConfig::default())
        .unwrap()
        .with_manager(manager);

    let err = runner.run("x y".as_bytes()).unwrap_err();
    assert!(matches!(
        err,
        RunnerError::Process(ProcessError::LaunchFailed { pid: 1, .. })
    ));
    assert_eq!(err.exit_code(), 126);
    assert_eq!(runner.manager().live(), 0);
}

#[cfg(unix)]
#[test]
fn test_non_executable_command_is_126() {
    use std::os::unix::fs::PermissionsExt;

    let file = tempfile::NamedTempFile::new().unwrap();
    std::fs::set_permissions(file.path(), std::fs::Permissions::from_mode(0o600)).unwrap();

    let config = RunnerConfig::builder()
        .utility([file.path().to_string_lossy().into_owned()])
        .build()
        .unwrap();
    let runner = Runner::new(config).unwrap().with_manager(quiet_manager());
    let err = runner.run("x".as_bytes()).unwrap_err();
    assert_eq!(err.exit_code(), 126);
}

#[test]
fn test_exit_255_aborts_dispatch() {
    let calls = Arc::new(AtomicUsize::new(0));
    let config = RunnerConfig::builder()
        .max_args(1)
        .utility(["counted"])
        .build()
        .unwrap();
    let runner = Runner::new(config)
        .unwrap()
        .with_manager(quiet_manager())
        .with_builtins(counting(255, Arc::clone(&calls)));

    let report = runner.run("a b c d".as_bytes()).unwrap();
    assert_eq!(
        report.outcome,
        Outcome::Aborted {
            pid: 1,
            status: ExitStatus::Exited(255)
        }
    );
    assert_eq!(report.exit_code(), 1);
    assert_eq!(report.launched, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_panicking_command_aborts() {
    let mut builtins = Builtins::standard();
    builtins.register("explode", |_| panic!("boom"));
    let config = RunnerConfig::builder()
        .max_args(1)
        .utility(["explode"])
        .build()
        .unwrap();
    let runner = Runner::new(config)
        .unwrap()
        .with_manager(quiet_manager())
        .with_builtins(builtins);

    let report = runner.run("a b".as_bytes()).unwrap();
    assert!(matches!(
        report.outcome,
        Outcome::Aborted { status: ExitStatus::Signaled(6), .. }
    ));
    assert_eq!(report.launched, 1);
}

#[test]
fn test_nonzero_exit_keeps_dispatching() {
    let calls = Arc::new(AtomicUsize::new(0));
    let config = RunnerConfig::builder()
        .max_args(1)
        .utility(["counted"])
        .build()
        .unwrap();
    let runner = Runner::new(config)
        .unwrap()
        .with_manager(quiet_manager())
        .with_builtins(counting(3, Arc::clone(&calls)));

    let report = runner.run("a b c".as_bytes()).unwrap();
    assert_eq!(report.outcome, Outcome::CommandFailed);
    assert_eq!(report.failures, 3);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[test]
fn test_input_errors_are_125() {
    let runner = Runner::new(RunnerConfig::default())
        .unwrap()
        .with_manager(quiet_manager());
    let err = runner.run("'open".as_bytes()).unwrap_err();
    assert_eq!(err.to_string(), "unterminated quote");
    assert_eq!(err.exit_code(), 125);

    let strict = RunnerConfig::builder()
        .max_args(10)
        .exit_on_overflow(true)
        .max_size(16)
        .utility(["echo"])
        .build()
        .unwrap();
    let runner = Runner::new(strict).unwrap().with_manager(quiet_manager());
    let err = runner.run("aaaa bbbb cccc".as_bytes()).unwrap_err();
    assert_eq!(err.exit_code(), 125);
}
