//! Mount API - Run a root component on the terminal.
//!
//! The root's `render` notifications bump a generation signal. One effect
//! tracks that signal and repaints the root's text content, so the screen
//! changes exactly when the component re-renders.
//!
//! # Example
//!
//! ```ignore
//! use hyperd::pipeline::mount;
//!
//! let root = hyperd::dom::create_element("div");
//! let app = App::class().instantiate(None).attach_to(root)?;
//!
//! // Option 1: blocking loop until Ctrl+C (or Escape)
//! let handle = mount::mount(&app)?;
//! mount::run(&handle)?;
//! handle.unmount();
//!
//! // Option 2: drive it yourself
//! let handle = mount::mount(&app)?;
//! while mount::tick(&handle)? {
//!     // your logic here
//! }
//! handle.unmount();
//! ```

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crossterm::event::{self, Event as TerminalEvent, KeyEvent};
use spark_signals::{effect, signal};

use super::config::{exit_on_escape, frame_interval, render_mode};
use super::input::{KeyAction, route_key};
use super::screen::Screen;
use crate::component::Component;
use crate::engine::{dom, frame};
use crate::error::{Error, Result};
use crate::types::ListenerId;

// =============================================================================
// Mount Handle
// =============================================================================

/// Handle returned by [`mount`]. Dropping it unmounts.
pub struct MountHandle {
    root: Component,
    listener: Option<ListenerId>,
    stop_effect: Option<Box<dyn FnOnce()>>,
    running: Arc<AtomicBool>,
    screen: Rc<RefCell<Screen>>,
}

impl MountHandle {
    /// The mounted component.
    pub fn root(&self) -> &Component {
        &self.root
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Ask the loop to stop after the current tick.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Number of repaints so far.
    pub fn paints(&self) -> u64 {
        self.screen.borrow().paints()
    }

    /// Stop repainting and restore the terminal. The component keeps running
    /// its own loop until destroyed.
    pub fn unmount(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        self.running.store(false, Ordering::SeqCst);

        if let Some(id) = self.listener.take() {
            // Already gone if the root was destroyed
            let _ = self.root.remove_listener("render", None, id);
        }
        if let Some(stop) = self.stop_effect.take() {
            stop();
        }
        if let Err(err) = self.screen.borrow_mut().exit() {
            tracing::warn!(%err, "terminal restore failed");
        }
    }
}

impl Drop for MountHandle {
    fn drop(&mut self) {
        self.teardown();
    }
}

// =============================================================================
// Mount Functions
// =============================================================================

/// Mount `root` on the terminal in the configured render mode.
pub fn mount(root: &Component) -> Result<MountHandle> {
    mount_on(root, Screen::terminal(render_mode()))
}

/// Mount `root` painting to `out` without touching terminal modes.
pub fn mount_headless(root: &Component, out: impl Write + 'static) -> Result<MountHandle> {
    mount_on(root, Screen::headless(out, render_mode()))
}

fn mount_on(root: &Component, mut screen: Screen) -> Result<MountHandle> {
    if root.is_destroyed() {
        return Err(Error::Destroyed(root.id()));
    }
    screen.enter()?;
    let screen = Rc::new(RefCell::new(screen));
    let running = Arc::new(AtomicBool::new(true));

    // Bumped on every render of the root
    let generation = signal(0u64);
    let bump = generation.clone();
    let listener = root.on("render", None, move |_, _| {
        bump.set(bump.get() + 1);
    })?;

    let weak_root = root.downgrade();
    let effect_screen = screen.clone();
    let effect_running = running.clone();
    let stop = effect(move || {
        // Tracked read
        let current = generation.get();
        if !effect_running.load(Ordering::SeqCst) {
            return;
        }
        let Some(node) = weak_root.upgrade().and_then(|root| root.node()) else {
            return;
        };

        let text = dom::text_content(node);
        tracing::trace!(generation = current, "repaint");
        if let Err(err) = effect_screen.borrow_mut().paint(&text) {
            tracing::warn!(%err, "repaint failed");
        }
    });

    tracing::debug!(component = %root.id(), mode = ?screen.borrow().mode(), "mounted");

    Ok(MountHandle {
        root: root.clone(),
        listener: Some(listener),
        stop_effect: Some(Box::new(stop)),
        running,
        screen,
    })
}

/// Unmount and clean up.
pub fn unmount(handle: MountHandle) {
    handle.unmount();
}

// =============================================================================
// Event Loop
// =============================================================================

/// Run one frame, then wait up to one frame interval for input.
///
/// Returns `Ok(false)` once the host should stop. Render failures propagate.
pub fn tick(handle: &MountHandle) -> Result<bool> {
    if !handle.is_running() {
        return Ok(false);
    }

    frame::run_frame()?;
    if handle.root.is_destroyed() {
        handle.stop();
        return Ok(false);
    }

    let interval = frame_interval();
    if handle.screen.borrow().is_interactive() {
        if event::poll(interval)? {
            if let TerminalEvent::Key(key) = event::read()? {
                send_key(handle, key);
            }
        }
    } else {
        std::thread::sleep(interval);
    }

    Ok(handle.is_running())
}

/// Run until stopped.
pub fn run(handle: &MountHandle) -> Result<()> {
    while tick(handle)? {}
    Ok(())
}

/// Route a key press to the mounted root as if it came from the terminal.
pub fn send_key(handle: &MountHandle, key: KeyEvent) -> KeyAction {
    let Some(node) = handle.root.node() else {
        return KeyAction::Ignored;
    };
    let action = route_key(node, key, exit_on_escape());
    if action == KeyAction::Exit {
        tracing::debug!("exit key pressed");
        handle.stop();
    }
    action
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{ComponentClass, Definition};
    use crate::engine::dom::{create_element, reset_document};
    use crate::engine::frame::reset_frames;
    use crate::pipeline::config::reset_config;
    use crossterm::event::{KeyCode, KeyModifiers};
    use serde_json::json;
    use std::io;

    #[derive(Clone, Default)]
    struct Shared(Rc<RefCell<Vec<u8>>>);

    impl Shared {
        fn text(&self) -> String {
            String::from_utf8(self.0.borrow().clone()).unwrap()
        }
    }

    impl Write for Shared {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn counter_class() -> ComponentClass {
        ComponentClass::new(
            Definition::new()
                .setup(|c| c.set_data(json!({ "count": 0 })))
                .render(|c| format!("<div>count {}</div>", c.data()["count"])),
        )
    }

    fn setup() {
        reset_document();
        reset_frames();
        reset_config();
    }

    #[test]
    fn test_repaints_on_render_only() {
        setup();
        let app = counter_class().instantiate(None).attach_to(create_element("div")).unwrap();
        let out = Shared::default();
        let handle = mount_headless(&app, out.clone()).unwrap();
        let initial = handle.paints();

        frame::run_frame().unwrap();
        assert_eq!(handle.paints(), initial + 1, "first render repaints");

        frame::run_frame().unwrap();
        assert_eq!(handle.paints(), initial + 1, "clean frames do not repaint");

        app.update_data(|data| data["count"] = json!(1));
        frame::run_frame().unwrap();
        assert_eq!(handle.paints(), initial + 2);
        assert!(out.text().ends_with("count 1\n"));

        handle.unmount();
        app.destroy();
    }

    #[test]
    fn test_keys_reach_component_and_exit() {
        setup();
        let app = counter_class().instantiate(None).attach_to(create_element("div")).unwrap();
        frame::run_frame().unwrap();
        app.on("keydown", None, |c, event| {
            if event.detail()[0] == json!("+") {
                c.update_data(|data| data["count"] = json!(data["count"].as_i64().unwrap_or(0) + 1));
            }
        })
        .unwrap();

        let handle = mount_headless(&app, Shared::default()).unwrap();
        assert_eq!(
            send_key(&handle, KeyEvent::new(KeyCode::Char('+'), KeyModifiers::NONE)),
            KeyAction::Dispatched(1)
        );
        assert_eq!(app.data()["count"], json!(1));

        assert_eq!(send_key(&handle, KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE)), KeyAction::Exit);
        assert!(!handle.is_running());
        assert!(!tick(&handle).unwrap());

        drop(handle);
        app.destroy();
    }

    #[test]
    fn test_mount_destroyed_component_fails() {
        setup();
        let app = counter_class().instantiate(None);
        app.destroy();
        assert!(matches!(mount_headless(&app, Shared::default()), Err(Error::Destroyed(_))));
    }
}
