/*!
 * Batching Tests
 * How input arguments become command lines
 */

use pretty_assertions::assert_eq;
use threadproc::process::CaptureBuffer;
use threadproc::{OutputSink, ProcessManager, Runner, RunnerConfig};

fn run_capturing(config: RunnerConfig, input: &str) -> (i32, String, String) {
    let (out, out_buf) = OutputSink::capture();
    let (err, err_buf) = OutputSink::capture();
    let manager = ProcessManager::builder()
        .with_stdout(out)
        .with_stderr(err)
        .build()
        .unwrap();
    let runner = Runner::new(config).unwrap().with_manager(manager);
    let code = runner.run(input.as_bytes()).unwrap().exit_code();
    (code, text(&out_buf), text(&err_buf))
}

fn text(buffer: &CaptureBuffer) -> String {
    buffer.to_string_lossy()
}

#[test]
fn test_default_echo_single_batch() {
    let (code, out, _) = run_capturing(RunnerConfig::default(), "one two\nthree\n");
    assert_eq!(code, 0);
    assert_eq!(out, "one two three\n");
}

#[test]
fn test_count_limit() {
    let config = RunnerConfig::builder().max_args(2).build().unwrap();
    let (_, out, _) = run_capturing(config, "1 2 3 4 5");
    assert_eq!(out, "1 2\n3 4\n5\n");
}

#[test]
fn test_line_limit() {
    let config = RunnerConfig::builder().max_lines(2).build().unwrap();
    let (_, out, _) = run_capturing(config, "a b\nc\nd\n\ne f\n");
    assert_eq!(out, "a b c\nd e f\n");
}

#[test]
fn test_size_limit() {
    // "echo" costs 5 of the 13 bytes and each "xx" costs 3
    let config = RunnerConfig::builder()
        .max_size(13)
        .utility(["echo"])
        .build()
        .unwrap();
    let (_, out, _) = run_capturing(config, "aa bb cc dd");
    assert_eq!(out, "aa bb\ncc dd\n");
}

#[test]
fn test_insert_mode() {
    let config = RunnerConfig::builder()
        .insert("{}")
        .utility(["echo", "<{}>", "[{}]"])
        .build()
        .unwrap();
    let (_, out, _) = run_capturing(config, "first line\nsecond\n");
    assert_eq!(out, "<first line> [first line]\n<second> [second]\n");
}

#[test]
fn test_splice_mode() {
    let config = RunnerConfig::builder()
        .splice("%")
        .max_args(2)
        .utility(["echo", "start", "%", "end"])
        .build()
        .unwrap();
    let (_, out, _) = run_capturing(config, "a b c");
    assert_eq!(out, "start a b end\nstart c end\n");
}

#[test]
fn test_eof_marker() {
    let config = RunnerConfig::builder().eof_str("_").build().unwrap();
    let (_, out, _) = run_capturing(config, "a b _ c d");
    assert_eq!(out, "a b\n");
}

#[test]
fn test_null_separated() {
    let config = RunnerConfig::builder()
        .null_separated(true)
        .max_args(1)
        .build()
        .unwrap();
    let (_, out, _) = run_capturing(config, "with space\0'quoted'\0");
    assert_eq!(out, "with space\n'quoted'\n");
}

#[test]
fn test_trace_echoes_commands_to_stderr() {
    let config = RunnerConfig::builder()
        .trace(true)
        .max_args(1)
        .build()
        .unwrap();
    let (_, out, err) = run_capturing(config, "x y");
    assert_eq!(out, "x\ny\n");
    assert_eq!(err, "echo x\necho y\n");
}

#[test]
fn test_setenv_overlay_reaches_command() {
    let config = RunnerConfig::builder()
        .env("THREADPROC_RUNNER_ONLY", "scoped")
        .utility(["printenv"])
        .build()
        .unwrap();
    let (code, out, _) = run_capturing(config, "THREADPROC_RUNNER_ONLY");
    assert_eq!(code, 0);
    assert_eq!(out, "scoped\n");
    assert!(std::env::var("THREADPROC_RUNNER_ONLY").is_err());
}
