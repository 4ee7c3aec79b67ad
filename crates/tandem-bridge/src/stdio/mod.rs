//! Process-wide standard stream slots
//!
//! Host code that wants its output to be redirectable writes through
//! [`stdout()`] / [`stderr()`] instead of `std::io`. Each stream is a
//! replaceable [`OutputWriter`] slot that starts out pointing at the real
//! process stream; [`StreamRedirector`] swaps in line-buffering adapters.
//!
//! Output written with `println!`, `eprintln!` or `std::io::stdout()` goes
//! straight to the process streams and is never redirected.

pub mod redirect;

pub use redirect::{LineBufferedWriter, StreamRedirector};

use std::fmt;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

/// Shared, replaceable output destination
pub type OutputWriter = Arc<Mutex<Box<dyn Write + Send>>>;

/// Which standard stream a line came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamTag {
    Stdout,
    Stderr,
}

impl StreamTag {
    pub fn is_stdout(self) -> bool {
        self == StreamTag::Stdout
    }
}

impl fmt::Display for StreamTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamTag::Stdout => write!(f, "stdout"),
            StreamTag::Stderr => write!(f, "stderr"),
        }
    }
}

/// Writer for the real process stream
pub fn process_writer(tag: StreamTag) -> OutputWriter {
    match tag {
        StreamTag::Stdout => Arc::new(Mutex::new(Box::new(io::stdout()))),
        StreamTag::Stderr => Arc::new(Mutex::new(Box::new(io::stderr()))),
    }
}

struct StreamSlot {
    writer: Mutex<OutputWriter>,
    owned: AtomicBool,
}

fn slot(tag: StreamTag) -> &'static StreamSlot {
    static STDOUT: OnceLock<StreamSlot> = OnceLock::new();
    static STDERR: OnceLock<StreamSlot> = OnceLock::new();
    let cell = match tag {
        StreamTag::Stdout => &STDOUT,
        StreamTag::Stderr => &STDERR,
    };
    cell.get_or_init(|| StreamSlot {
        writer: Mutex::new(process_writer(tag)),
        owned: AtomicBool::new(false),
    })
}

/// The writer currently behind `tag`
pub fn current(tag: StreamTag) -> OutputWriter {
    slot(tag)
        .writer
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .clone()
}

/// Install `writer` behind `tag`, returning the previous one
pub fn replace(tag: StreamTag, writer: OutputWriter) -> OutputWriter {
    let mut current = slot(tag).writer.lock().unwrap_or_else(|e| e.into_inner());
    std::mem::replace(&mut *current, writer)
}

/// Claim exclusive redirection of `tag`; `false` if already claimed
pub(crate) fn acquire(tag: StreamTag) -> bool {
    slot(tag)
        .owned
        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        .is_ok()
}

pub(crate) fn release(tag: StreamTag) {
    slot(tag).owned.store(false, Ordering::Release);
}

/// Whether a redirector currently owns `tag`
pub fn is_redirected(tag: StreamTag) -> bool {
    slot(tag).owned.load(Ordering::Acquire)
}

/// Handle writing to whatever is currently installed behind a stream
///
/// Each call resolves the slot anew, so a handle taken before a
/// redirection follows it.
#[derive(Debug, Clone, Copy)]
pub struct HostStream {
    tag: StreamTag,
}

impl HostStream {
    pub fn tag(&self) -> StreamTag {
        self.tag
    }

    /// Run `f` with the current writer locked
    ///
    /// Several writes made inside `f` cannot interleave with other threads.
    /// `f` must not write through another handle to the same stream.
    pub fn with_lock<R>(&self, f: impl FnOnce(&mut dyn Write) -> R) -> R {
        let writer = current(self.tag);
        let mut writer = writer.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut **writer)
    }
}

impl Write for HostStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let writer = current(self.tag);
        let mut writer = writer.lock().unwrap_or_else(|e| e.into_inner());
        writer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        let writer = current(self.tag);
        let mut writer = writer.lock().unwrap_or_else(|e| e.into_inner());
        writer.flush()
    }
}

/// The host's standard output
pub fn stdout() -> HostStream {
    HostStream {
        tag: StreamTag::Stdout,
    }
}

/// The host's standard error
pub fn stderr() -> HostStream {
    HostStream {
        tag: StreamTag::Stderr,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_stream_tag_display() {
        assert_eq!(StreamTag::Stdout.to_string(), "stdout");
        assert_eq!(StreamTag::Stderr.to_string(), "stderr");
        assert!(StreamTag::Stdout.is_stdout());
    }

    #[test]
    #[serial]
    fn test_replace_and_restore() {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let capture: OutputWriter = Arc::new(Mutex::new(Box::new(Capture(buf.clone()))));

        let original = replace(StreamTag::Stderr, capture);
        write!(stderr(), "captured").unwrap();
        let capture = replace(StreamTag::Stderr, original);

        assert_eq!(buf.lock().unwrap().as_slice(), b"captured");
        drop(capture);
    }

    #[test]
    #[serial]
    fn test_acquire_is_exclusive() {
        assert!(acquire(StreamTag::Stdout));
        assert!(is_redirected(StreamTag::Stdout));
        assert!(!acquire(StreamTag::Stdout));
        release(StreamTag::Stdout);
        assert!(!is_redirected(StreamTag::Stdout));
    }
}
