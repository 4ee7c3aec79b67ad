//! Native boundary backed by a loaded dynamic library
//!
//! The library exports a small C ABI:
//!
//! ```text
//! int  tandem_call(uint64_t token, const char *descriptor,
//!                  const char *args_json, char **out);
//! void tandem_free_string(char *s);
//! void tandem_write_line(const char *line, int is_stdout);   // optional
//! void tandem_release(uint64_t token);                        // optional
//! ```
//!
//! `tandem_call` status codes:
//! - 0: `*out` holds the JSON result (or null for void)
//! - 1: `*out` holds a JSON foreign error `{"message": .., "stack": [..]}`
//! - anything else: the boundary failed, `*out` may hold a description

use crate::error::BridgeError;
use crate::ffi::boundary::{CallResult, ForeignError, LineSink, NativeBoundary};
use crate::ffi::loader::{LibraryLoader, LoadError};
use crate::ffi::marshal::{args_to_json, value_from_json};
use crate::ffi::safety::{ForeignString, FreeStringFn, SafeCString};
use crate::ffi::types::MethodDescriptor;
use crate::ffi::NativeRef;
use crate::stdio::StreamTag;
use crate::value::Value;
use libloading::Library;
use std::io;
use std::os::raw::{c_char, c_int};
use std::sync::Arc;
use tracing::{debug, trace};

pub type CallFn =
    unsafe extern "C" fn(u64, *const c_char, *const c_char, *mut *mut c_char) -> c_int;
pub type WriteLineFn = unsafe extern "C" fn(*const c_char, c_int);
pub type ReleaseFn = unsafe extern "C" fn(u64);

const STATUS_RETURNED: c_int = 0;
const STATUS_THREW: c_int = 1;

/// Boundary that forwards calls through C function pointers
pub struct LibraryBoundary {
    call_fn: CallFn,
    free_fn: FreeStringFn,
    write_line_fn: Option<WriteLineFn>,
    release_fn: Option<ReleaseFn>,
    /// Keeps the symbols above mapped
    _library: Option<Arc<Library>>,
}

impl LibraryBoundary {
    /// Load the boundary library through `loader` and bind its exports
    pub fn open(loader: &mut LibraryLoader, name: &str) -> Result<Self, LoadError> {
        let library = loader.load(name)?;

        let symbol_error = |symbol: &str| LoadError::SymbolNotFound {
            library: name.to_string(),
            symbol: symbol.to_string(),
        };

        // Function pointers are copied out of the symbols; the Arc keeps them valid.
        let (call_fn, free_fn, write_line_fn, release_fn) = unsafe {
            let call_fn = *library
                .get::<CallFn>(b"tandem_call\0")
                .map_err(|_| symbol_error("tandem_call"))?;
            let free_fn = *library
                .get::<FreeStringFn>(b"tandem_free_string\0")
                .map_err(|_| symbol_error("tandem_free_string"))?;
            let write_line_fn = library
                .get::<WriteLineFn>(b"tandem_write_line\0")
                .ok()
                .map(|s| *s);
            let release_fn = library
                .get::<ReleaseFn>(b"tandem_release\0")
                .ok()
                .map(|s| *s);
            (call_fn, free_fn, write_line_fn, release_fn)
        };

        debug!(
            library = name,
            write_line = write_line_fn.is_some(),
            release = release_fn.is_some(),
            "bound boundary library"
        );

        Ok(Self {
            call_fn,
            free_fn,
            write_line_fn,
            release_fn,
            _library: Some(library),
        })
    }

    /// Bind functions that are already linked into the process
    ///
    /// # Safety
    ///
    /// The functions must follow the `tandem_*` contract described in the
    /// module docs and stay valid for the lifetime of the boundary.
    pub unsafe fn from_raw_symbols(
        call_fn: CallFn,
        free_fn: FreeStringFn,
        write_line_fn: Option<WriteLineFn>,
        release_fn: Option<ReleaseFn>,
    ) -> Self {
        Self {
            call_fn,
            free_fn,
            write_line_fn,
            release_fn,
            _library: None,
        }
    }
}

impl NativeBoundary for LibraryBoundary {
    fn call(
        &self,
        target: NativeRef,
        method: &MethodDescriptor,
        args: &[Value],
    ) -> Result<CallResult, BridgeError> {
        let descriptor = SafeCString::new(&method.signature())
            .map_err(|e| BridgeError::Boundary(e.to_string()))?;
        let args_json = SafeCString::new(&args_to_json(args)?)
            .map_err(|e| BridgeError::Boundary(e.to_string()))?;

        let mut out: *mut c_char = std::ptr::null_mut();
        let status = unsafe {
            (self.call_fn)(target.raw(), descriptor.as_ptr(), args_json.as_ptr(), &mut out)
        };
        let text = unsafe { ForeignString::from_raw(out, self.free_fn) }
            .map(|s| s.to_string_lossy())
            .unwrap_or_default();
        trace!(%target, method = %method.signature(), status, "boundary call returned");

        match status {
            STATUS_RETURNED => Ok(CallResult::Returned(value_from_json(&text)?)),
            STATUS_THREW => {
                let error = serde_json::from_str::<ForeignError>(&text)
                    .unwrap_or_else(|_| ForeignError::new(text));
                Ok(CallResult::Threw(error))
            }
            other => Err(BridgeError::Boundary(format!(
                "tandem_call returned status {}: {}",
                other, text
            ))),
        }
    }

    fn release(&self, target: NativeRef) {
        if let Some(release_fn) = self.release_fn {
            unsafe { release_fn(target.raw()) }
        }
    }
}

impl LineSink for LibraryBoundary {
    fn write_line(&self, line: &str, stream: StreamTag) -> io::Result<()> {
        let write_line_fn = self.write_line_fn.ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::Unsupported,
                "boundary library does not export tandem_write_line",
            )
        })?;
        let line =
            SafeCString::new(line).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let is_stdout = c_int::from(stream == StreamTag::Stdout);
        unsafe { write_line_fn(line.as_ptr(), is_stdout) };
        Ok(())
    }
}
