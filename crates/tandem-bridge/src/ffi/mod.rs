//! Native boundary infrastructure
//!
//! Connects host proxies to the foreign runtime via:
//! - Declared method types (`types`)
//! - Value ↔ JSON marshaling (`marshal`)
//! - Dynamic library loading (`loader`, `library`)
//! - In-process callback tables for embedding and tests (`callbacks`)
//!
//! # Safety
//!
//! Calls into a loaded library involve `unsafe` code and foreign-owned memory.
//! All unsafe code is isolated in this module with safe wrappers.

pub mod boundary;
pub mod callbacks;
pub mod library;
pub mod loader;
pub mod marshal;
pub mod safety;
pub mod types;

pub use boundary::{CallResult, ForeignError, LineSink, NativeBoundary};
pub use callbacks::CallbackTable;
pub use library::LibraryBoundary;
pub use loader::{normalize_library_path, LibraryLoader, LoadError};
pub use marshal::MarshalError;
pub use types::{MethodDescriptor, ParamType};

use std::fmt;

/// Opaque token identifying a foreign-side object
///
/// Only meaningful to the boundary; the bridge never interprets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NativeRef(pub u64);

impl NativeRef {
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NativeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}
