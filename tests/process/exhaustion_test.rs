/*!
 * Identifier Exhaustion Tests
 * Full tables block or report exhaustion, never hand out duplicates
 */

use pretty_assertions::assert_eq;
use std::collections::HashSet;
use std::sync::mpsc;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;
use threadproc::process::ProcessTable;
use threadproc::{Command, ExitStatus, OutputSink, ProcessError, ProcessManager};

#[test]
fn test_full_table_reports_exhaustion() {
    let table = ProcessTable::new();
    let pids: HashSet<_> = (0..127).map(|_| table.allocate().pid).collect();
    assert_eq!(pids.len(), 127);
    assert!(!pids.contains(&0));
    assert_eq!(table.try_allocate(), Err(ProcessError::Exhausted(127)));
}

#[test]
fn test_reuse_after_reap_on_full_table() {
    let pm = ProcessManager::builder()
        .with_capacity(4)
        .with_stdout(OutputSink::Null)
        .build()
        .unwrap();
    let gate = Arc::new(Barrier::new(4));

    let pids: Vec<_> = (0..3)
        .map(|i| {
            let gate = Arc::clone(&gate);
            pm.spawn(Command::routine("hold", move |_| {
                gate.wait();
                i
            }))
            .unwrap()
        })
        .collect();
    assert_eq!(pids, vec![1, 2, 3]);
    assert!(pm.table().try_allocate().is_err());

    gate.wait();
    assert_eq!(pm.wait(2), Ok(ExitStatus::Exited(1)));

    // only the reaped identifier comes back
    let again = pm.spawn(Command::routine("next", |_| 0)).unwrap();
    assert_eq!(again, 2);

    for pid in [1, 2, 3] {
        pm.wait(pid).unwrap();
    }
}

#[test]
fn test_spawn_blocks_until_reap() {
    let pm = ProcessManager::builder()
        .with_capacity(2)
        .with_stdout(OutputSink::Null)
        .build()
        .unwrap();
    let first = pm.spawn(Command::routine("first", |_| 0)).unwrap();

    let (tx, rx) = mpsc::channel();
    let spawner = {
        let pm = pm.clone();
        thread::spawn(move || {
            let pid = pm.spawn(Command::routine("second", |_| 0));
            tx.send(pid).unwrap();
        })
    };

    // terminated but unreaped still holds the only identifier
    assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());

    assert_eq!(pm.wait(first), Ok(ExitStatus::SUCCESS));
    let second = rx.recv_timeout(Duration::from_secs(5)).unwrap().unwrap();
    assert_eq!(second, first);
    spawner.join().unwrap();
    pm.wait(second).unwrap();
}
