//! Merged cross-runtime stack traces
//!
//! - `frame`: the host frame model and the foreign frame grammar
//! - `translator`: merges a foreign failure into a `TranslatedException`
//! - `host`: thread-local record of host frames that end up in merged traces

pub mod frame;
pub mod host;
pub mod translator;

pub use frame::{parse_frame, FrameOrigin, ParsedFrame, StackFrame};
pub use host::{enter, HostFrameGuard};
pub use translator::{ExceptionTranslator, TranslatedException, DEFAULT_FOREIGN_MARKER};
