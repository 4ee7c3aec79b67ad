//! Tandem bridge
//!
//! Lets host code call interface methods whose bodies live in a foreign
//! runtime reachable only through a native boundary:
//!
//! - [`proxy`]: interface proxies with a per-proxy dispatch table and a
//!   validity-guarded native handle
//! - [`trace`]: merges a foreign failure's textual trace with host frames
//! - [`stdio`]: line-buffered redirection of the host's stdout/stderr
//! - [`ffi`]: the boundary seams, a shared-library boundary and an
//!   in-process callback boundary
//! - [`session`]: ties a boundary, translator and proxy registry together
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use tandem_bridge::ffi::{CallbackTable, ForeignError, ParamType};
//! use tandem_bridge::proxy::InterfaceDecl;
//! use tandem_bridge::{BridgeError, BridgeSession, Value};
//!
//! let table = Arc::new(CallbackTable::new());
//! let session = BridgeSession::new(table.clone());
//!
//! let decl = InterfaceDecl::new("Parser").method("parse", &[ParamType::String], ParamType::Any);
//! let parser = session.create_proxy(&decl, ["parse"]);
//! table.register(parser.token(), "parse", |_| {
//!     Err(ForeignError::new("unexpected token").with_frame("parse", "parser.js", 12))
//! });
//!
//! match parser.invoke("parse", &[Value::from("{")]) {
//!     Err(BridgeError::Foreign(ex)) => {
//!         assert_eq!(ex.message(), "unexpected token");
//!         assert_eq!(ex.foreign_frames().count(), 1);
//!     }
//!     other => panic!("unexpected result: {:?}", other),
//! }
//! ```

pub mod error;
pub mod ffi;
pub mod logging;
pub mod proxy;
pub mod session;
pub mod stdio;
pub mod trace;
pub mod value;

pub use error::{BridgeError, BridgeResult};
pub use ffi::{CallResult, ForeignError, LineSink, NativeBoundary, NativeRef};
pub use proxy::{InterfaceDecl, InterfaceProxy};
pub use session::BridgeSession;
pub use stdio::{StreamRedirector, StreamTag};
pub use trace::{ExceptionTranslator, StackFrame, TranslatedException};
pub use value::Value;

/// Bridge version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
