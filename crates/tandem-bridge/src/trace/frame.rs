//! Stack frames and the foreign frame grammar

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// Where a frame came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOrigin {
    Host,
    Foreign,
}

/// One entry of a merged trace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame {
    /// Host type name, or the foreign marker for synthesized frames
    pub declaring_type: String,
    pub symbol: String,
    pub file: String,
    pub line: u32,
    pub origin: FrameOrigin,
}

impl StackFrame {
    pub fn host(declaring_type: &str, symbol: &str, file: &str, line: u32) -> Self {
        Self {
            declaring_type: declaring_type.to_string(),
            symbol: symbol.to_string(),
            file: file.to_string(),
            line,
            origin: FrameOrigin::Host,
        }
    }

    pub fn is_foreign(&self) -> bool {
        self.origin == FrameOrigin::Foreign
    }
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "at {}.{}({}:{})",
            self.declaring_type, self.symbol, self.file, self.line
        )
    }
}

/// Fields of a foreign frame line that matched the grammar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFrame {
    pub symbol: String,
    pub location: String,
    pub line: u32,
    pub column: Option<u32>,
}

// `at symbol (location:line[:column])`, optionally indented. The location
// ends in a letter run with optional digits (an extension such as `js` or
// `mp4`), which keeps `:line:column` out of it.
const FRAME_PATTERN: &str = r"(?i)^\s*at (?P<symbol>[a-z\d._\-:]+) \((?P<location>[a-z\d._\\/()\s\-:]*[a-z]+\d*):(?P<line>\d+)(?::(?P<column>\d+))?\)$";

fn frame_regex() -> Option<&'static Regex> {
    static FRAME_RE: OnceLock<Option<Regex>> = OnceLock::new();
    FRAME_RE
        .get_or_init(|| Regex::new(FRAME_PATTERN).ok())
        .as_ref()
}

/// Parse one foreign frame line
///
/// Returns `None` when the line does not match, or when the line number
/// does not fit in a `u32`.
///
/// ```
/// # use tandem_bridge::trace::parse_frame;
/// let frame = parse_frame("    at foo (bar.js:10:3)").unwrap();
/// assert_eq!(frame.symbol, "foo");
/// assert_eq!(frame.location, "bar.js");
/// assert_eq!(frame.line, 10);
/// assert_eq!(frame.column, Some(3));
/// ```
pub fn parse_frame(text: &str) -> Option<ParsedFrame> {
    let captures = frame_regex()?.captures(text)?;
    let line = captures["line"].parse().ok()?;
    let column = match captures.name("column") {
        Some(column) => Some(column.as_str().parse().ok()?),
        None => None,
    };
    Some(ParsedFrame {
        symbol: captures["symbol"].to_string(),
        location: captures["location"].to_string(),
        line,
        column,
    })
}
