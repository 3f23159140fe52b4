//! Host configuration signals.
//!
//! Read with the getters, change with the setters. The `*_signal()`
//! accessors return the signal itself for reactive tracking.

use std::cell::RefCell;
use std::time::Duration;

use spark_signals::{Signal, signal};

/// Default frame pacing, roughly 60 frames per second.
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// How the host paints to the terminal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RenderMode {
    /// Alternate screen, repainted from the top-left on every render.
    #[default]
    Fullscreen,
    /// Normal screen buffer; the painted block is rewritten in place.
    Inline,
}

thread_local! {
    static FRAME_INTERVAL: RefCell<Signal<Duration>> = RefCell::new(signal(DEFAULT_FRAME_INTERVAL));
    static RENDER_MODE: RefCell<Signal<RenderMode>> = RefCell::new(signal(RenderMode::Fullscreen));
    static EXIT_ON_ESCAPE: RefCell<Signal<bool>> = RefCell::new(signal(true));
}

// =============================================================================
// Frame Interval
// =============================================================================

/// Time between host frames.
pub fn frame_interval() -> Duration {
    FRAME_INTERVAL.with(|s| s.borrow().get())
}

/// Change the frame pacing. Zero is clamped to one millisecond.
pub fn set_frame_interval(interval: Duration) {
    let interval = interval.max(Duration::from_millis(1));
    FRAME_INTERVAL.with(|s| s.borrow().set(interval));
}

pub fn frame_interval_signal() -> Signal<Duration> {
    FRAME_INTERVAL.with(|s| s.borrow().clone())
}

// =============================================================================
// Render Mode
// =============================================================================

pub fn render_mode() -> RenderMode {
    RENDER_MODE.with(|s| s.borrow().get())
}

/// Takes effect on the next mount.
pub fn set_render_mode(mode: RenderMode) {
    RENDER_MODE.with(|s| s.borrow().set(mode));
}

pub fn render_mode_signal() -> Signal<RenderMode> {
    RENDER_MODE.with(|s| s.borrow().clone())
}

// =============================================================================
// Exit Keys
// =============================================================================

/// Whether Escape stops the host. Ctrl+C always does.
pub fn exit_on_escape() -> bool {
    EXIT_ON_ESCAPE.with(|s| s.borrow().get())
}

pub fn set_exit_on_escape(enabled: bool) {
    EXIT_ON_ESCAPE.with(|s| s.borrow().set(enabled));
}

// =============================================================================
// Reset (for testing)
// =============================================================================

/// Restore every setting to its default.
pub fn reset_config() {
    set_frame_interval(DEFAULT_FRAME_INTERVAL);
    set_render_mode(RenderMode::Fullscreen);
    set_exit_on_escape(true);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_setters() {
        reset_config();
        assert_eq!(frame_interval(), DEFAULT_FRAME_INTERVAL);
        assert_eq!(render_mode(), RenderMode::Fullscreen);
        assert!(exit_on_escape());

        set_frame_interval(Duration::from_millis(33));
        set_render_mode(RenderMode::Inline);
        set_exit_on_escape(false);
        assert_eq!(frame_interval(), Duration::from_millis(33));
        assert_eq!(render_mode_signal().get(), RenderMode::Inline);
        assert!(!exit_on_escape());

        reset_config();
        assert_eq!(render_mode(), RenderMode::Fullscreen);
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        reset_config();
        set_frame_interval(Duration::ZERO);
        assert_eq!(frame_interval(), Duration::from_millis(1));
        reset_config();
    }
}
