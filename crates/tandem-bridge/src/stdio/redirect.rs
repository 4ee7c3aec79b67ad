//! Line-buffered redirection of the standard streams to a line sink

use crate::error::{BridgeError, BridgeResult};
use crate::ffi::boundary::LineSink;
use crate::stdio::{self, OutputWriter, StreamTag};
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Adapter that turns a byte stream into trimmed lines
///
/// A newline always forwards the accumulated text, even when it trims to
/// an empty line. An explicit flush forwards only a non-empty buffer. The
/// buffer is cleared before the sink is called, so a failing sink never
/// causes the same line to be delivered twice.
///
/// A line the sink rejects does not stop the rest of the write: later
/// lines are still forwarded and the input counts as written. The first
/// rejection is held back and returned by the next `write` or `flush`.
pub struct LineBufferedWriter {
    tag: StreamTag,
    sink: Arc<dyn LineSink>,
    buffer: Vec<u8>,
    rejected: Option<io::Error>,
}

impl LineBufferedWriter {
    pub fn new(tag: StreamTag, sink: Arc<dyn LineSink>) -> Self {
        Self {
            tag,
            sink,
            buffer: Vec::new(),
            rejected: None,
        }
    }

    pub fn tag(&self) -> StreamTag {
        self.tag
    }

    /// Bytes waiting for a newline or flush
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    fn write_buffer(&mut self) -> io::Result<()> {
        // Decoded as a whole so multi-byte characters split across writes survive
        let line = String::from_utf8_lossy(&self.buffer).trim().to_string();
        self.buffer.clear();
        self.sink.write_line(&line, self.tag)
    }
}

impl Write for LineBufferedWriter {
    /// Returns a previously held rejection without consuming `buf`.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Some(e) = self.rejected.take() {
            return Err(e);
        }
        for &byte in buf {
            if byte != b'\n' {
                self.buffer.push(byte);
                continue;
            }
            if let Err(e) = self.write_buffer() {
                self.rejected.get_or_insert(e);
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let flushed = if self.buffer.is_empty() {
            Ok(())
        } else {
            self.write_buffer()
        };
        match self.rejected.take() {
            Some(e) => Err(e),
            None => flushed,
        }
    }
}

/// Scoped redirection of stdout and/or stderr
///
/// Construction swaps line-buffering adapters into the requested stream
/// slots; [`reset`](Self::reset) (or dropping the redirector) puts the saved
/// writers back. Only one redirector may own a given stream at a time.
///
/// The sink must not write to a stream it is receiving lines from.
pub struct StreamRedirector {
    saved: Vec<(StreamTag, OutputWriter)>,
}

impl StreamRedirector {
    /// Redirect the selected streams to `sink`
    ///
    /// Fails with `StreamBusy` if another redirector owns one of them; in
    /// that case nothing is redirected.
    pub fn new(
        redirect_stdout: bool,
        redirect_stderr: bool,
        sink: Arc<dyn LineSink>,
    ) -> BridgeResult<Self> {
        let requested = [
            (redirect_stdout, StreamTag::Stdout),
            (redirect_stderr, StreamTag::Stderr),
        ];

        let mut acquired = Vec::new();
        for tag in requested.iter().filter(|(on, _)| *on).map(|(_, tag)| *tag) {
            if !stdio::acquire(tag) {
                for taken in acquired {
                    stdio::release(taken);
                }
                return Err(BridgeError::StreamBusy(tag));
            }
            acquired.push(tag);
        }

        let saved = acquired
            .into_iter()
            .map(|tag| {
                let adapter: OutputWriter = Arc::new(Mutex::new(Box::new(
                    LineBufferedWriter::new(tag, Arc::clone(&sink)),
                )));
                debug!(stream = %tag, "redirecting stream");
                (tag, stdio::replace(tag, adapter))
            })
            .collect();

        Ok(Self { saved })
    }

    pub fn is_redirecting(&self, tag: StreamTag) -> bool {
        self.saved.iter().any(|(saved, _)| *saved == tag)
    }

    /// Put the saved writers back
    ///
    /// Any partial line still buffered is forwarded first. Streams that
    /// were not redirected are left alone; calling this again is a no-op.
    pub fn reset(&mut self) {
        for (tag, original) in self.saved.drain(..) {
            let adapter = stdio::replace(tag, original);
            let flushed = adapter.lock().unwrap_or_else(|e| e.into_inner()).flush();
            if let Err(e) = flushed {
                warn!(stream = %tag, error = %e, "line sink rejected the final line");
            }
            stdio::release(tag);
            debug!(stream = %tag, "restored stream");
        }
    }
}

impl Drop for StreamRedirector {
    fn drop(&mut self) {
        self.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Lines(Mutex<Vec<(String, StreamTag)>>);

    impl LineSink for Lines {
        fn write_line(&self, line: &str, stream: StreamTag) -> io::Result<()> {
            self.0.lock().unwrap().push((line.to_string(), stream));
            Ok(())
        }
    }

    impl Lines {
        fn taken(&self) -> Vec<String> {
            self.0.lock().unwrap().iter().map(|(l, _)| l.clone()).collect()
        }
    }

    #[test]
    fn test_newline_forwards_trimmed() {
        let sink = Arc::new(Lines::default());
        let mut writer = LineBufferedWriter::new(StreamTag::Stdout, sink.clone());
        writer.write_all(b"  hello  \nworld").unwrap();
        assert_eq!(sink.taken(), vec!["hello"]);
        assert_eq!(writer.pending(), b"world");

        writer.flush().unwrap();
        assert_eq!(sink.taken(), vec!["hello", "world"]);
        assert!(writer.pending().is_empty());
    }

    #[test]
    fn test_empty_flush_is_noop() {
        let sink = Arc::new(Lines::default());
        let mut writer = LineBufferedWriter::new(StreamTag::Stderr, sink.clone());
        writer.flush().unwrap();
        assert!(sink.taken().is_empty());
    }

    #[test]
    fn test_bare_newline_forwards_empty_line() {
        let sink = Arc::new(Lines::default());
        let mut writer = LineBufferedWriter::new(StreamTag::Stdout, sink.clone());
        writer.write_all(b"\n").unwrap();
        assert_eq!(sink.taken(), vec![""]);
    }

    #[test]
    fn test_split_utf8_survives() {
        let sink = Arc::new(Lines::default());
        let mut writer = LineBufferedWriter::new(StreamTag::Stdout, sink.clone());
        let bytes = "héllo\n".as_bytes();
        writer.write_all(&bytes[..2]).unwrap();
        writer.write_all(&bytes[2..]).unwrap();
        assert_eq!(sink.taken(), vec!["héllo"]);
    }

    #[test]
    fn test_failing_sink_clears_buffer() {
        let failing = |_: &str, _: StreamTag| -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone"))
        };
        let mut writer = LineBufferedWriter::new(StreamTag::Stdout, Arc::new(failing));
        writer.write_all(b"abc\n").unwrap();
        assert!(writer.pending().is_empty());

        let err = writer.flush().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert!(writer.flush().is_ok());
    }

    #[test]
    fn test_rejected_line_does_not_swallow_later_lines() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let seen = seen.clone();
            move |line: &str, _: StreamTag| -> io::Result<()> {
                seen.lock().unwrap().push(line.to_string());
                if line == "a" {
                    Err(io::Error::new(io::ErrorKind::Other, "rejected a"))
                } else {
                    Ok(())
                }
            }
        };
        let mut writer = LineBufferedWriter::new(StreamTag::Stdout, Arc::new(sink));

        assert_eq!(writer.write(b"a\nb\nc").unwrap(), 5);
        assert_eq!(writer.pending(), b"c");
        assert_eq!(*seen.lock().unwrap(), vec!["a", "b"]);

        assert!(writer.flush().is_err());
        assert_eq!(*seen.lock().unwrap(), vec!["a", "b", "c"]);
        assert!(writer.pending().is_empty());
    }

    #[test]
    fn test_held_rejection_consumes_nothing() {
        let fail_next = Arc::new(Mutex::new(true));
        let sink = {
            let fail_next = fail_next.clone();
            move |_: &str, _: StreamTag| -> io::Result<()> {
                if std::mem::replace(&mut *fail_next.lock().unwrap(), false) {
                    Err(io::Error::new(io::ErrorKind::Other, "once"))
                } else {
                    Ok(())
                }
            }
        };
        let mut writer = LineBufferedWriter::new(StreamTag::Stdout, Arc::new(sink));

        writer.write_all(b"x\n").unwrap();
        assert!(writer.write(b"later").is_err());
        assert!(writer.pending().is_empty());
        assert_eq!(writer.write(b"later").unwrap(), 5);
        assert_eq!(writer.pending(), b"later");
    }
}
