/*!
 * Environment Scope Tests
 * Overlays stay private to the logical process that owns them
 */

use pretty_assertions::assert_eq;
use serial_test::serial;
use std::env;
use std::sync::{Arc, Barrier};
use threadproc::{Command, EnvOverlay, ExitStatus, OutputSink, ProcessManager};

fn manager_with_capture() -> (ProcessManager, threadproc::process::CaptureBuffer) {
    let (sink, buffer) = OutputSink::capture();
    let pm = ProcessManager::builder()
        .with_stdout(sink)
        .with_stderr(OutputSink::Null)
        .build()
        .unwrap();
    (pm, buffer)
}

#[test]
#[serial]
fn test_overlay_shadows_global_value() {
    env::set_var("THREADPROC_SCOPE_FOO", "global");
    let (pm, buffer) = manager_with_capture();

    let pid = pm
        .spawn(
            Command::routine("printenv", threadproc::builtins::printenv)
                .arg("THREADPROC_SCOPE_FOO")
                .env("THREADPROC_SCOPE_FOO", "bar"),
        )
        .unwrap();
    assert_eq!(pm.wait(pid), Ok(ExitStatus::SUCCESS));
    assert_eq!(buffer.to_string_lossy(), "bar\n");
    assert_eq!(env::var("THREADPROC_SCOPE_FOO").as_deref(), Ok("global"));
    env::remove_var("THREADPROC_SCOPE_FOO");
}

#[test]
#[serial]
fn test_unset_names_fall_through_to_global() {
    env::set_var("THREADPROC_SCOPE_INHERITED", "shared");
    let (pm, buffer) = manager_with_capture();

    let pid = pm
        .spawn(
            Command::routine("printenv", threadproc::builtins::printenv)
                .arg("THREADPROC_SCOPE_INHERITED")
                .env("UNRELATED", "x"),
        )
        .unwrap();
    pm.wait(pid).unwrap();
    assert_eq!(buffer.to_string_lossy(), "shared\n");
    env::remove_var("THREADPROC_SCOPE_INHERITED");
}

#[test]
fn test_concurrent_overlays_do_not_cross_talk() {
    let pm = ProcessManager::new();
    let gate = Arc::new(Barrier::new(9));
    let mut pids = Vec::new();

    for i in 0..8 {
        let gate = Arc::clone(&gate);
        let expected = format!("value-{}", i);
        let pid = pm
            .spawn(
                Command::routine("scoped", move |ctx| {
                    // everyone holds their overlay at the same time
                    gate.wait();
                    match ctx.getenv("THREADPROC_SCOPE_SLOT") {
                        Some(v) if v == expected => 0,
                        _ => 1,
                    }
                })
                .overlay(EnvOverlay::new().with("THREADPROC_SCOPE_SLOT", format!("value-{}", i))),
            )
            .unwrap();
        assert_eq!(
            pm.getenv(pid, "THREADPROC_SCOPE_SLOT"),
            Some(format!("value-{}", i))
        );
        pids.push(pid);
    }

    gate.wait();
    for pid in pids {
        assert_eq!(pm.wait(pid), Ok(ExitStatus::SUCCESS));
    }
}

#[test]
#[serial]
fn test_printenv_lists_merged_environment() {
    env::set_var("THREADPROC_SCOPE_LISTED", "old");
    let (pm, buffer) = manager_with_capture();

    let pid = pm
        .spawn(
            Command::routine("printenv", threadproc::builtins::printenv)
                .env("THREADPROC_SCOPE_LISTED", "new")
                .env("THREADPROC_SCOPE_ONLY_HERE", "1"),
        )
        .unwrap();
    pm.wait(pid).unwrap();

    let listing = buffer.to_string_lossy();
    assert!(listing.contains("THREADPROC_SCOPE_LISTED=new\n"));
    assert!(!listing.contains("THREADPROC_SCOPE_LISTED=old"));
    assert!(listing.ends_with("THREADPROC_SCOPE_ONLY_HERE=1\n"));
    env::remove_var("THREADPROC_SCOPE_LISTED");
}
