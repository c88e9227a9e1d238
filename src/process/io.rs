/*!
 * Output Sinks
 * Where a logical process writes its standard output and error
 */

use parking_lot::Mutex;
use std::io::{self, Write};
use std::sync::Arc;

/// In-memory buffer shared between a sink and whoever inspects it
#[derive(Debug, Clone, Default)]
pub struct CaptureBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl CaptureBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything written so far
    pub fn contents(&self) -> Vec<u8> {
        self.bytes.lock().clone()
    }

    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.bytes.lock()).into_owned()
    }

    pub fn clear(&self) {
        self.bytes.lock().clear();
    }
}

impl Write for CaptureBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Destination for one output stream of a logical process
#[derive(Debug, Clone, Default)]
pub enum OutputSink {
    /// The host's standard output
    #[default]
    Stdout,
    /// The host's standard error
    Stderr,
    /// Shared in-memory buffer
    Capture(CaptureBuffer),
    /// Discard everything
    Null,
}

impl OutputSink {
    /// Capture into a fresh buffer, returning the sink and its buffer
    pub fn capture() -> (Self, CaptureBuffer) {
        let buffer = CaptureBuffer::new();
        (OutputSink::Capture(buffer.clone()), buffer)
    }
}

impl Write for OutputSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            OutputSink::Stdout => io::stdout().lock().write(buf),
            OutputSink::Stderr => io::stderr().lock().write(buf),
            OutputSink::Capture(buffer) => buffer.write(buf),
            OutputSink::Null => Ok(buf.len()),
        }
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        // hold the host lock for the whole line so concurrent processes don't interleave
        match self {
            OutputSink::Stdout => io::stdout().lock().write_all(buf),
            OutputSink::Stderr => io::stderr().lock().write_all(buf),
            OutputSink::Capture(buffer) => buffer.write_all(buf),
            OutputSink::Null => Ok(()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            OutputSink::Stdout => io::stdout().flush(),
            OutputSink::Stderr => io::stderr().flush(),
            OutputSink::Capture(_) | OutputSink::Null => Ok(()),
        }
    }
}
