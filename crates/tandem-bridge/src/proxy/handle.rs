//! Validity-guarded native handle
//!
//! A single atomic word holds both the invalid flag (high bit) and the number
//! of calls currently using the handle. Taking a lease and invalidating are
//! therefore ordered against each other: a lease either observes the handle
//! as valid and is counted, or fails. Calls already holding a lease when the
//! handle is invalidated run to completion.

use crate::ffi::NativeRef;
use std::sync::atomic::{AtomicUsize, Ordering};

const INVALID: usize = 1 << (usize::BITS - 1);
const IN_FLIGHT: usize = !INVALID;

#[derive(Debug)]
pub struct NativeHandle {
    token: NativeRef,
    state: AtomicUsize,
}

impl NativeHandle {
    pub fn new(token: NativeRef) -> Self {
        Self {
            token,
            state: AtomicUsize::new(0),
        }
    }

    pub fn token(&self) -> NativeRef {
        self.token
    }

    pub fn is_valid(&self) -> bool {
        self.state.load(Ordering::Acquire) & INVALID == 0
    }

    /// Number of calls currently holding a lease
    pub fn in_flight(&self) -> usize {
        self.state.load(Ordering::Acquire) & IN_FLIGHT
    }

    /// Lease the token for one forwarded call
    ///
    /// Returns `None` once the handle is invalid.
    pub fn try_use(&self) -> Option<HandleLease<'_>> {
        self.state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |state| {
                if state & INVALID != 0 || state & IN_FLIGHT == IN_FLIGHT {
                    None
                } else {
                    Some(state + 1)
                }
            })
            .ok()
            .map(|_| HandleLease { handle: self })
    }

    /// Mark the handle invalid
    ///
    /// Idempotent. Returns `true` if this call performed the transition.
    pub fn invalidate(&self) -> bool {
        self.state.fetch_or(INVALID, Ordering::AcqRel) & INVALID == 0
    }
}

/// Proof that a call is allowed to use the token
#[derive(Debug)]
pub struct HandleLease<'a> {
    handle: &'a NativeHandle,
}

impl HandleLease<'_> {
    pub fn token(&self) -> NativeRef {
        self.handle.token
    }
}

impl Drop for HandleLease<'_> {
    fn drop(&mut self) {
        self.handle.state.fetch_sub(1, Ordering::AcqRel);
    }
}
