//! Frame Scheduler - One callback per display frame, cancellable.
//!
//! Callbacks are queued with [`request_frame`] and run by [`run_frame`].
//! A callback requested while a frame is running lands in the next frame,
//! so a component that reschedules itself ticks exactly once per frame.
//!
//! # Example
//!
//! ```ignore
//! use hyperd::engine::frame;
//!
//! let handle = frame::request_frame(|| {
//!     // per-frame work
//!     Ok(())
//! });
//!
//! frame::cancel_frame(handle); // never runs
//! frame::run_frame()?;
//! ```

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use crate::error::Result;

/// Callback run once on the next frame.
pub type FrameCallback = Box<dyn FnOnce() -> Result<()>>;

/// Handle of a pending frame callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameHandle(u64);

struct PendingFrame {
    handle: FrameHandle,
    callback: FrameCallback,
}

thread_local! {
    /// Callbacks waiting for a frame, in request order.
    static QUEUE: RefCell<VecDeque<PendingFrame>> = RefCell::new(VecDeque::new());

    /// Next handle to hand out. Handles increase monotonically.
    static NEXT_HANDLE: Cell<u64> = const { Cell::new(0) };

    /// Number of frames run on this thread.
    static FRAME_COUNT: Cell<u64> = const { Cell::new(0) };
}

// =============================================================================
// Public API
// =============================================================================

/// Queue `callback` for the next frame.
pub fn request_frame(callback: impl FnOnce() -> Result<()> + 'static) -> FrameHandle {
    let handle = NEXT_HANDLE.with(|next| {
        let id = next.get();
        next.set(id + 1);
        FrameHandle(id)
    });

    QUEUE.with(|queue| {
        queue.borrow_mut().push_back(PendingFrame {
            handle,
            callback: Box::new(callback),
        });
    });
    handle
}

/// Cancel a pending callback. Returns false if it already ran or was cancelled.
pub fn cancel_frame(handle: FrameHandle) -> bool {
    QUEUE.with(|queue| {
        let mut queue = queue.borrow_mut();
        let before = queue.len();
        queue.retain(|pending| pending.handle != handle);
        queue.len() != before
    })
}

/// Run every callback that was pending when the frame started.
///
/// Returns the number of callbacks run. If a callback fails, the error is
/// returned immediately and the callbacks after it stay queued for the next
/// frame.
pub fn run_frame() -> Result<usize> {
    // Anything requested from here on belongs to the next frame
    let boundary = NEXT_HANDLE.with(Cell::get);
    FRAME_COUNT.with(|count| count.set(count.get() + 1));

    let mut ran = 0;
    loop {
        // Pop one at a time so callbacks may request or cancel frames
        let next = QUEUE.with(|queue| {
            let mut queue = queue.borrow_mut();
            match queue.front() {
                Some(pending) if pending.handle.0 < boundary => queue.pop_front(),
                _ => None,
            }
        });
        let Some(pending) = next else { break };

        (pending.callback)()?;
        ran += 1;
    }

    tracing::trace!(ran, "frame complete");
    Ok(ran)
}

/// Run `frames` frames back to back, stopping at the first error.
pub fn run_frames(frames: usize) -> Result<usize> {
    let mut ran = 0;
    for _ in 0..frames {
        ran += run_frame()?;
    }
    Ok(ran)
}

/// Number of callbacks waiting for a frame.
pub fn pending_frames() -> usize {
    QUEUE.with(|queue| queue.borrow().len())
}

/// Check whether a specific callback is still pending.
pub fn is_pending(handle: FrameHandle) -> bool {
    QUEUE.with(|queue| queue.borrow().iter().any(|p| p.handle == handle))
}

/// Number of frames run on this thread.
pub fn frame_count() -> u64 {
    FRAME_COUNT.with(Cell::get)
}

// =============================================================================
// Reset (for testing)
// =============================================================================

/// Drop all pending callbacks and reset counters.
pub fn reset_frames() {
    QUEUE.with(|queue| queue.borrow_mut().clear());
    FRAME_COUNT.with(|count| count.set(0));
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::rc::Rc;

    #[test]
    fn test_request_and_run() {
        reset_frames();

        let calls = Rc::new(Cell::new(0));
        let calls_clone = calls.clone();
        request_frame(move || {
            calls_clone.set(calls_clone.get() + 1);
            Ok(())
        });

        assert_eq!(pending_frames(), 1);
        assert_eq!(run_frame().unwrap(), 1);
        assert_eq!(calls.get(), 1);
        assert_eq!(pending_frames(), 0);
        assert_eq!(run_frame().unwrap(), 0, "callbacks run once");
    }

    #[test]
    fn test_cancel() {
        reset_frames();

        let handle = request_frame(|| panic!("cancelled callback ran"));
        assert!(is_pending(handle));
        assert!(cancel_frame(handle));
        assert!(!cancel_frame(handle), "second cancel finds nothing");
        assert_eq!(run_frame().unwrap(), 0);
    }

    #[test]
    fn test_requests_during_frame_run_next_frame() {
        reset_frames();

        let calls = Rc::new(Cell::new(0));

        fn schedule(calls: Rc<Cell<u32>>) {
            request_frame(move || {
                calls.set(calls.get() + 1);
                schedule(calls);
                Ok(())
            });
        }
        schedule(calls.clone());

        run_frame().unwrap();
        assert_eq!(calls.get(), 1, "self-rescheduling runs once per frame");
        run_frames(3).unwrap();
        assert_eq!(calls.get(), 4);
        assert_eq!(pending_frames(), 1);
    }

    #[test]
    fn test_cancel_from_inside_frame() {
        reset_frames();

        let second: Rc<Cell<Option<FrameHandle>>> = Rc::new(Cell::new(None));
        let second_clone = second.clone();
        request_frame(move || {
            if let Some(handle) = second_clone.get() {
                cancel_frame(handle);
            }
            Ok(())
        });
        second.set(Some(request_frame(|| panic!("cancelled mid-frame"))));

        assert_eq!(run_frame().unwrap(), 1);
    }

    #[test]
    fn test_error_keeps_remaining_callbacks() {
        reset_frames();

        request_frame(|| Err(Error::MissingRender("broken".into())));
        let after = request_frame(|| Ok(()));

        assert!(run_frame().is_err());
        assert!(is_pending(after), "callbacks after the failure stay queued");
        assert_eq!(run_frame().unwrap(), 1);
    }
}
