/*!
 * Concurrency Ceiling Tests
 * The runner never has more than -P commands active at once
 */

use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use threadproc::runner::Outcome;
use threadproc::{Builtins, OutputSink, ProcessManager, Runner, RunnerConfig};

/// Builtin that records how many copies of itself run at once
fn gauge(active: Arc<AtomicUsize>, peak: Arc<AtomicUsize>) -> Builtins {
    let mut builtins = Builtins::standard();
    builtins.register("gauge", move |ctx| {
        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(30));
        active.fetch_sub(1, Ordering::SeqCst);
        ctx.args()
            .last()
            .and_then(|a| a.parse().ok())
            .unwrap_or(0)
    });
    builtins
}

fn quiet_manager() -> ProcessManager {
    ProcessManager::builder()
        .with_stdout(OutputSink::Null)
        .with_stderr(OutputSink::Null)
        .build()
        .unwrap()
}

#[test]
fn test_three_batches_with_ceiling_two() {
    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let config = RunnerConfig::builder()
        .max_procs(2)
        .max_args(1)
        .utility(["gauge"])
        .build()
        .unwrap();
    let runner = Runner::new(config)
        .unwrap()
        .with_manager(quiet_manager())
        .with_builtins(gauge(active, Arc::clone(&peak)));

    let report = runner.run("0\n1\n2\n".as_bytes()).unwrap();

    assert_eq!(report.launched, 3);
    assert_eq!(report.peak_active, 2);
    assert_eq!(report.failures, 2);
    assert_eq!(report.outcome, Outcome::CommandFailed);
    assert_eq!(report.exit_code(), 1);
    assert!(peak.load(Ordering::SeqCst) <= 2);
}

#[test]
fn test_ceiling_is_never_exceeded() {
    for ceiling in [1usize, 3, 8] {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let config = RunnerConfig::builder()
            .max_procs(ceiling)
            .max_args(1)
            .utility(["gauge"])
            .build()
            .unwrap();
        let runner = Runner::new(config)
            .unwrap()
            .with_manager(quiet_manager())
            .with_builtins(gauge(active, Arc::clone(&peak)));

        let input = "0 ".repeat(20);
        let report = runner.run(input.as_bytes()).unwrap();

        assert_eq!(report.outcome, Outcome::Success);
        assert_eq!(report.launched, 20);
        assert!(report.peak_active <= ceiling);
        assert!(peak.load(Ordering::SeqCst) <= ceiling);
        assert_eq!(runner.manager().live(), 0);
    }
}

#[test]
fn test_drain_reaps_everything() {
    let config = RunnerConfig::builder()
        .max_procs(4)
        .max_args(2)
        .utility(["true"])
        .build()
        .unwrap();
    let runner = Runner::new(config).unwrap().with_manager(quiet_manager());
    let report = runner.run("a b c d e f g".as_bytes()).unwrap();
    assert_eq!(report.launched, 4);
    assert_eq!(report.outcome, Outcome::Success);
    assert_eq!(runner.manager().live(), 0);
}
