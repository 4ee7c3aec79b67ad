//! Safe wrappers for strings crossing the native boundary
//!
//! - `SafeCString`: host-owned text lent to the foreign side for one call
//! - `ForeignString`: foreign-owned text, handed back to the foreign allocator on drop

use std::ffi::{CStr, CString, NulError};
use std::os::raw::c_char;

/// Deallocator exported by the boundary library
pub type FreeStringFn = unsafe extern "C" fn(*mut c_char);

/// RAII wrapper for C strings ensuring cleanup
pub struct SafeCString {
    inner: CString,
}

impl SafeCString {
    /// Create a new SafeCString from a Rust string
    pub fn new(s: &str) -> Result<Self, NulError> {
        Ok(Self {
            inner: CString::new(s)?,
        })
    }

    /// Get the raw pointer for C code
    pub fn as_ptr(&self) -> *const c_char {
        self.inner.as_ptr()
    }
}

impl std::ops::Deref for SafeCString {
    type Target = CStr;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// A string allocated by the foreign side
///
/// Freed with the library's own deallocator when dropped.
pub struct ForeignString {
    ptr: *mut c_char,
    free: FreeStringFn,
}

impl ForeignString {
    /// Take ownership of a foreign allocation
    ///
    /// Returns `None` for a null pointer.
    ///
    /// # Safety
    ///
    /// `ptr` must be a NUL-terminated string allocated by the library that
    /// exports `free`, and must not be used by anyone else afterwards.
    pub unsafe fn from_raw(ptr: *mut c_char, free: FreeStringFn) -> Option<Self> {
        if ptr.is_null() {
            None
        } else {
            Some(Self { ptr, free })
        }
    }

    /// Decode the text, replacing invalid UTF-8
    pub fn to_string_lossy(&self) -> String {
        unsafe { CStr::from_ptr(self.ptr) }
            .to_string_lossy()
            .into_owned()
    }
}

impl Drop for ForeignString {
    fn drop(&mut self) {
        unsafe { (self.free)(self.ptr) }
    }
}

/// Read a borrowed C string, replacing invalid UTF-8
///
/// Returns `None` for a null pointer.
///
/// # Safety
///
/// `ptr` must be null or point at a NUL-terminated string valid for the call.
pub unsafe fn borrowed_str(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        None
    } else {
        Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static FREED: AtomicUsize = AtomicUsize::new(0);

    unsafe extern "C" fn counting_free(ptr: *mut c_char) {
        drop(CString::from_raw(ptr));
        FREED.fetch_add(1, Ordering::SeqCst);
    }

    #[test]
    fn test_safe_cstring() {
        let s = SafeCString::new("hello").unwrap();
        assert_eq!(s.to_str().unwrap(), "hello");
        assert!(!s.as_ptr().is_null());
    }

    #[test]
    fn test_safe_cstring_rejects_nul() {
        assert!(SafeCString::new("a\0b").is_err());
    }

    #[test]
    fn test_foreign_string_freed_on_drop() {
        let raw = CString::new("owned").unwrap().into_raw();
        let before = FREED.load(Ordering::SeqCst);
        {
            let s = unsafe { ForeignString::from_raw(raw, counting_free) }.unwrap();
            assert_eq!(s.to_string_lossy(), "owned");
        }
        assert_eq!(FREED.load(Ordering::SeqCst), before + 1);
    }

    #[test]
    fn test_null_pointers() {
        assert!(unsafe { ForeignString::from_raw(std::ptr::null_mut(), counting_free) }.is_none());
        assert_eq!(unsafe { borrowed_str(std::ptr::null()) }, None);
    }
}
