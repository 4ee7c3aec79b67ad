//! The seams between the bridge and the foreign runtime
//!
//! - `NativeBoundary`: forwards a resolved method call to the foreign side
//! - `LineSink`: receives complete output lines on behalf of the foreign side

use crate::error::BridgeError;
use crate::ffi::types::MethodDescriptor;
use crate::ffi::NativeRef;
use crate::stdio::StreamTag;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::io;

/// Outcome of a forwarded call that reached the foreign side
#[derive(Debug, Clone, PartialEq)]
pub enum CallResult {
    Returned(Value),
    Threw(ForeignError),
}

/// Failure reported by the foreign runtime
///
/// `stack` holds the raw frame lines (`at symbol (file:line[:col])`), most
/// recent first, without the message header.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ForeignError {
    pub message: String,
    #[serde(default)]
    pub stack: Vec<String>,
}

impl ForeignError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stack: Vec::new(),
        }
    }

    /// Build from a full stack text whose first line is the message header
    ///
    /// ```
    /// # use tandem_bridge::ffi::ForeignError;
    /// let err = ForeignError::from_stack_text("boom", "Error: boom\n    at f (a.js:1:2)");
    /// assert_eq!(err.stack, vec!["    at f (a.js:1:2)".to_string()]);
    /// ```
    pub fn from_stack_text(message: impl Into<String>, text: &str) -> Self {
        Self {
            message: message.into(),
            stack: text.lines().skip(1).map(str::to_string).collect(),
        }
    }

    /// Prepend a frame, making it the most recent one
    pub fn push_frame(&mut self, symbol: &str, file: &str, line: u32) {
        self.stack.insert(0, format!("\tat {} ({}:{})", symbol, file, line));
    }

    pub fn with_frame(mut self, symbol: &str, file: &str, line: u32) -> Self {
        self.push_frame(symbol, file, line);
        self
    }
}

/// Forwards calls to objects living in the foreign runtime
///
/// Implementations must be callable from any thread; the bridge holds no lock
/// while a call is in flight.
pub trait NativeBoundary: Send + Sync {
    /// Invoke `method` on the foreign object behind `target`
    ///
    /// `Err` is reserved for failures of the boundary itself. A foreign-side
    /// failure is `Ok(CallResult::Threw(..))`.
    fn call(
        &self,
        target: NativeRef,
        method: &MethodDescriptor,
        args: &[Value],
    ) -> Result<CallResult, BridgeError>;

    /// Notify the foreign side that the host dropped its last use of `target`
    fn release(&self, _target: NativeRef) {}
}

/// Receives complete lines written to a redirected stream
pub trait LineSink: Send + Sync {
    fn write_line(&self, line: &str, stream: StreamTag) -> io::Result<()>;
}

impl<F> LineSink for F
where
    F: Fn(&str, StreamTag) -> io::Result<()> + Send + Sync,
{
    fn write_line(&self, line: &str, stream: StreamTag) -> io::Result<()> {
        self(line, stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_from_stack_text_drops_header() {
        let err = ForeignError::from_stack_text(
            "bad",
            "Error: bad\n    at one (a.js:1:1)\n    at two (b.js:2:2)",
        );
        assert_eq!(err.message, "bad");
        assert_eq!(err.stack.len(), 2);
        assert!(err.stack[1].contains("two"));
    }

    #[test]
    fn test_push_frame_prepends() {
        let err = ForeignError::new("x")
            .with_frame("inner", "a.js", 3)
            .with_frame("outer", "b.js", 7);
        assert_eq!(err.stack[0], "\tat outer (b.js:7)");
        assert_eq!(err.stack[1], "\tat inner (a.js:3)");
    }

    #[test]
    fn test_deserialize_without_stack() {
        let err: ForeignError = serde_json::from_str(r#"{"message":"m"}"#).unwrap();
        assert_eq!(err, ForeignError::new("m"));
    }

    #[test]
    fn test_closure_line_sink() {
        let seen = Mutex::new(Vec::new());
        let sink = |line: &str, tag: StreamTag| {
            seen.lock().unwrap().push((line.to_string(), tag));
            Ok(())
        };
        sink.write_line("hi", StreamTag::Stdout).unwrap();
        assert_eq!(
            seen.lock().unwrap().as_slice(),
            &[("hi".to_string(), StreamTag::Stdout)]
        );
    }
}
