/*!
 * Program Execution Tests
 * External programs launched as logical processes
 */

use pretty_assertions::assert_eq;
use threadproc::{Command, ExecFailure, ExitStatus, OutputSink, ProcessManager};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

fn capturing_manager() -> (ProcessManager, threadproc::process::CaptureBuffer) {
    let (sink, buffer) = OutputSink::capture();
    let pm = ProcessManager::builder()
        .with_stdout(sink)
        .with_stderr(OutputSink::Null)
        .build()
        .unwrap();
    (pm, buffer)
}

#[test]
fn test_shell_exit_code() {
    let (pm, _) = capturing_manager();
    let pid = pm
        .spawn(Command::new("sh").args(["-c", "exit 3"]))
        .unwrap();
    let status = pm.wait(pid).unwrap();
    assert_eq!(status, ExitStatus::Exited(3));
    assert_eq!(status.raw(), 3 << 8);
}

#[test]
fn test_program_output_is_captured() {
    let (pm, buffer) = capturing_manager();
    let pid = pm
        .spawn(Command::new("sh").args(["-c", "echo out; echo err >&2"]))
        .unwrap();
    assert_eq!(pm.wait(pid), Ok(ExitStatus::SUCCESS));
    assert_eq!(buffer.to_string_lossy(), "out\n");
}

#[test]
fn test_missing_program_is_not_found() {
    let (pm, _) = capturing_manager();
    let pid = pm
        .spawn(Command::new("threadproc-no-such-utility"))
        .unwrap();
    let status = pm.wait(pid).unwrap();
    assert_eq!(status, ExitStatus::ExecFailed(ExecFailure::NotFound));
    assert_eq!(status.exit_code(), 127);
}

#[test]
fn test_missing_absolute_path_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent");
    let (pm, _) = capturing_manager();
    let pid = pm
        .spawn(Command::new(path.to_string_lossy()))
        .unwrap();
    assert_eq!(
        pm.wait(pid),
        Ok(ExitStatus::ExecFailed(ExecFailure::NotFound))
    );
}

#[cfg(unix)]
#[test]
fn test_non_executable_file_is_permission_denied() {
    let file = tempfile::NamedTempFile::new().unwrap();
    std::fs::set_permissions(file.path(), std::fs::Permissions::from_mode(0o644)).unwrap();

    let (pm, _) = capturing_manager();
    let pid = pm
        .spawn(Command::new(file.path().to_string_lossy()))
        .unwrap();
    let status = pm.wait(pid).unwrap();
    assert_eq!(status, ExitStatus::ExecFailed(ExecFailure::PermissionDenied));
    assert_eq!(status.exit_code(), 126);
}

#[cfg(unix)]
#[test]
fn test_signaled_program() {
    let (pm, _) = capturing_manager();
    let pid = pm
        .spawn(Command::new("sh").args(["-c", "kill -9 $$"]))
        .unwrap();
    let status = pm.wait(pid).unwrap();
    assert_eq!(status, ExitStatus::Signaled(9));
    assert!(status.is_abnormal());
}

#[test]
fn test_overlay_reaches_program() {
    let (pm, buffer) = capturing_manager();
    let pid = pm
        .spawn(
            Command::new("sh")
                .args(["-c", "printf %s \"$THREADPROC_EXEC_VAR\""])
                .env("THREADPROC_EXEC_VAR", "from-overlay"),
        )
        .unwrap();
    pm.wait(pid).unwrap();
    assert_eq!(buffer.to_string_lossy(), "from-overlay");
}
