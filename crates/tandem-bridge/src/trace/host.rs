//! Thread-local record of host frames
//!
//! Host code marks the frames it wants to appear in merged traces with
//! [`enter`]; the returned guard pops the frame when it goes out of scope.
//! Proxy calls record themselves this way.

use crate::trace::frame::StackFrame;
use std::cell::RefCell;
use std::marker::PhantomData;
use std::panic::Location;

thread_local! {
    static HOST_FRAMES: RefCell<Vec<StackFrame>> = const { RefCell::new(Vec::new()) };
}

/// Pops the frame pushed by [`enter`] (and anything pushed after it)
#[must_use = "the frame is popped as soon as the guard is dropped"]
#[derive(Debug)]
pub struct HostFrameGuard {
    depth: usize,
    // Tied to the thread whose stack it truncates
    _not_send: PhantomData<*const ()>,
}

impl Drop for HostFrameGuard {
    fn drop(&mut self) {
        let _ = HOST_FRAMES.try_with(|frames| frames.borrow_mut().truncate(self.depth));
    }
}

/// Record a host frame at the caller's location
#[track_caller]
pub fn enter(declaring_type: &str, symbol: &str) -> HostFrameGuard {
    let location = Location::caller();
    let frame = StackFrame::host(declaring_type, symbol, location.file(), location.line());
    let depth = HOST_FRAMES.with(|frames| {
        let mut frames = frames.borrow_mut();
        frames.push(frame);
        frames.len() - 1
    });
    HostFrameGuard {
        depth,
        _not_send: PhantomData,
    }
}

/// Current host frames, innermost first
pub fn snapshot() -> Vec<StackFrame> {
    HOST_FRAMES
        .try_with(|frames| frames.borrow().iter().rev().cloned().collect())
        .unwrap_or_default()
}

/// Number of recorded frames on this thread
pub fn depth() -> usize {
    HOST_FRAMES
        .try_with(|frames| frames.borrow().len())
        .unwrap_or(0)
}
