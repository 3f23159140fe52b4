//! Engine - Live structure, selectors and the frame scheduler.
//!
//! The engine owns the thread-local state every component shares:
//! - Dom: the node arena patches are applied to
//! - Selector: matching used by delegation and queries
//! - Frame: the per-frame callback queue that drives render loops
//!
//! # Architecture
//!
//! Nodes are NOT objects. They are generation-checked indices into one
//! arena per thread:
//!
//! ```text
//! #0v0: Element div   (parent=None, children=[#1v0])
//! #1v0: Element span  (parent=#0v0, children=[#2v0])
//! #2v0: Text "hi"     (parent=#1v0)
//! ```

pub mod dom;
pub mod frame;
pub mod selector;

pub use dom::{Attributes, NodeId, NodeKind};
pub use frame::{FrameHandle, cancel_frame, request_frame, run_frame, run_frames};
pub use selector::Selector;
