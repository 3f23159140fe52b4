//! Terminal Host
//!
//! Mounts a root component on the terminal and drives its frames.
//!
//! # Pipeline Architecture
//!
//! ```text
//! frame::run_frame → component ticks → `render` listener → generation signal
//!                                                              │
//!                         screen ←── repaint effect ←──────────┘
//! terminal keys → input::route_key → `keydown` dispatched at the root
//! ```
//!
//! ## Key Design Principles
//!
//! - **One effect**: only the repaint effect writes to the terminal
//! - **Signals for config**: frame pacing, render mode and exit keys are
//!   thread-local signals with getters and setters

pub mod config;
pub mod input;
pub mod mount;
pub mod screen;

pub use config::{
    DEFAULT_FRAME_INTERVAL, RenderMode, exit_on_escape, frame_interval, render_mode,
    set_exit_on_escape, set_frame_interval, set_render_mode,
};
pub use input::KeyAction;
pub use mount::{MountHandle, mount, mount_headless, run, send_key, tick, unmount};
