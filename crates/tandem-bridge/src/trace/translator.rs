//! Merge foreign failures into host-readable traces

use crate::ffi::boundary::ForeignError;
use crate::trace::frame::{parse_frame, FrameOrigin, StackFrame};
use crate::trace::host;
use std::fmt;
use std::panic::Location;
use thiserror::Error;
use tracing::trace;

pub use tandem_config::loader::DEFAULT_FOREIGN_MARKER;

/// A foreign failure with a merged trace
///
/// Frame order: the translation call site, then the parsed foreign frames
/// in their original order, then the recorded host frames (innermost first).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TranslatedException {
    message: String,
    frames: Vec<StackFrame>,
    dropped_frames: usize,
}

impl TranslatedException {
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn frames(&self) -> &[StackFrame] {
        &self.frames
    }

    pub fn foreign_frames(&self) -> impl Iterator<Item = &StackFrame> {
        self.frames.iter().filter(|f| f.is_foreign())
    }

    /// Foreign frame lines that did not match the grammar
    pub fn dropped_frames(&self) -> usize {
        self.dropped_frames
    }

    /// The message followed by one `\tat ...` line per frame
    pub fn render_trace(&self) -> String {
        TraceDisplay(self).to_string()
    }
}

struct TraceDisplay<'a>(&'a TranslatedException);

impl fmt::Display for TraceDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.message)?;
        for frame in &self.0.frames {
            write!(f, "\n\t{}", frame)?;
        }
        Ok(())
    }
}

/// Builds [`TranslatedException`]s, tagging foreign frames with a marker
#[derive(Debug, Clone)]
pub struct ExceptionTranslator {
    marker: String,
}

impl Default for ExceptionTranslator {
    fn default() -> Self {
        Self::new(DEFAULT_FOREIGN_MARKER)
    }
}

impl ExceptionTranslator {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Merge `message` and the foreign frame lines into one exception
    ///
    /// The first frame sits at the caller's location and is named after the
    /// innermost frame recorded with [`host::enter`], or `host.<unknown>`
    /// when nothing is recorded. Never fails: lines outside the frame
    /// grammar are dropped and counted.
    #[track_caller]
    pub fn translate<S: AsRef<str>>(
        &self,
        message: &str,
        foreign_frames: &[S],
    ) -> TranslatedException {
        let host_frames = host::snapshot();
        let site = match host_frames.first() {
            Some(innermost) => self.site_frame(&innermost.declaring_type, &innermost.symbol),
            None => self.site_frame("host", "<unknown>"),
        };
        self.merge(site, message, foreign_frames, host_frames)
    }

    /// Like [`translate`](Self::translate), naming the first frame
    /// `declaring_type.symbol`
    #[track_caller]
    pub fn translate_in<S: AsRef<str>>(
        &self,
        declaring_type: &str,
        symbol: &str,
        message: &str,
        foreign_frames: &[S],
    ) -> TranslatedException {
        let site = self.site_frame(declaring_type, symbol);
        self.merge(site, message, foreign_frames, host::snapshot())
    }

    /// Translate a structured foreign error payload
    #[track_caller]
    pub fn translate_error(&self, error: &ForeignError) -> TranslatedException {
        self.translate(&error.message, error.stack.as_slice())
    }

    /// Translate a payload raised by `declaring_type.symbol`
    #[track_caller]
    pub fn translate_error_in(
        &self,
        declaring_type: &str,
        symbol: &str,
        error: &ForeignError,
    ) -> TranslatedException {
        self.translate_in(declaring_type, symbol, &error.message, error.stack.as_slice())
    }

    #[track_caller]
    fn site_frame(&self, declaring_type: &str, symbol: &str) -> StackFrame {
        let site = Location::caller();
        StackFrame::host(declaring_type, symbol, site.file(), site.line())
    }

    fn merge<S: AsRef<str>>(
        &self,
        site: StackFrame,
        message: &str,
        foreign_frames: &[S],
        host_frames: Vec<StackFrame>,
    ) -> TranslatedException {
        let mut frames = Vec::with_capacity(foreign_frames.len() + host_frames.len() + 1);
        frames.push(site);

        let mut dropped_frames = 0;
        for text in foreign_frames {
            let text = text.as_ref();
            match parse_frame(text) {
                Some(parsed) => frames.push(StackFrame {
                    declaring_type: self.marker.clone(),
                    symbol: parsed.symbol,
                    file: parsed.location,
                    line: parsed.line,
                    origin: FrameOrigin::Foreign,
                }),
                None => {
                    dropped_frames += 1;
                    trace!(frame = text, "dropping malformed foreign frame");
                }
            }
        }

        frames.extend(host_frames);

        TranslatedException {
            message: message.to_string(),
            frames,
            dropped_frames,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_first_frame_is_call_site() {
        let line = line!() + 1;
        let ex = ExceptionTranslator::default().translate::<&str>("boom", &[]);
        assert_eq!(ex.frames()[0].file, file!());
        assert_eq!(ex.frames()[0].line, line);
        assert_eq!(ex.frames()[0].origin, FrameOrigin::Host);
    }

    #[test]
    fn test_foreign_frames_in_order() {
        let ex = ExceptionTranslator::new("js").translate(
            "boom",
            &["at foo (bar.js:10:3)", "garbage line", "at baz (qux/quux.ts:42)"],
        );

        let foreign: Vec<_> = ex.foreign_frames().collect();
        assert_eq!(foreign.len(), 2);
        assert_eq!(foreign[0].symbol, "foo");
        assert_eq!(foreign[0].declaring_type, "js");
        assert_eq!(foreign[1].file, "qux/quux.ts");
        assert_eq!(ex.dropped_frames(), 1);
    }

    #[test]
    fn test_host_frames_come_last() {
        let _frame = host::enter("App", "main");
        let ex = ExceptionTranslator::default().translate("boom", &["at foo (bar.js:1)"]);
        let last = ex.frames().last().unwrap();
        assert_eq!(last.symbol, "main");
        assert_eq!(last.origin, FrameOrigin::Host);
    }

    #[test]
    fn test_render_trace() {
        let ex = ExceptionTranslator::default().translate("boom", &["at foo (bar.js:10:3)"]);
        let rendered = ex.render_trace();
        let lines: Vec<_> = rendered.lines().collect();
        assert_eq!(lines[0], "boom");
        assert!(lines[1].starts_with("\tat host.<unknown>("));
        assert_eq!(lines[2], "\tat external.foo(bar.js:10)");
        assert_eq!(ex.to_string(), "boom");
    }

    #[test]
    fn test_site_named_after_innermost_host_frame() {
        let _outer = host::enter("App", "main");
        let _inner = host::enter("Worker", "step");
        let line = line!() + 1;
        let ex = ExceptionTranslator::default().translate::<&str>("boom", &[]);

        let site = &ex.frames()[0];
        assert_eq!((site.declaring_type.as_str(), site.symbol.as_str()), ("Worker", "step"));
        assert_eq!(site.line, line);
        assert_eq!(ex.frames().len(), 3);
    }

    #[test]
    fn test_translate_in_names_site() {
        let error = ForeignError::new("bad").with_frame("f", "a.js", 2);
        let line = line!() + 1;
        let ex = ExceptionTranslator::default().translate_error_in("Store", "save", &error);

        let site = &ex.frames()[0];
        assert_eq!(site.to_string(), format!("at Store.save({}:{})", file!(), line));
        assert_eq!(ex.frames()[1].symbol, "f");
    }

    #[test]
    fn test_translate_error_payload() {
        let error = ForeignError::new("bad").with_frame("f", "a.js", 2);
        let ex = ExceptionTranslator::default().translate_error(&error);
        assert_eq!(ex.message(), "bad");
        assert_eq!(ex.foreign_frames().count(), 1);
    }
}
