//! Events - Dispatched events and per-component delegation scopes.
//!
//! # API
//!
//! - `Event::new(type)` / `Event::custom(type, detail)` - Build an event
//! - `dispatch(target, &event)` - Bubble an event from `target` to the top
//! - `Delegate` - A delegation scope bound to one root node
//!
//! # Example
//!
//! ```ignore
//! use hyperd::events::{self, Delegate, Event};
//!
//! let delegate = Delegate::new();
//! delegate.root(Some(root));
//! delegate.on("click", Some("button"), Rc::new(|event| {
//!     println!("clicked {:?}", event.delegate_target());
//! }))?;
//!
//! events::dispatch(button, &Event::new("click"));
//! ```

mod delegate;

pub use delegate::{Delegate, Handler, dispatch, reset_delegates};

use std::cell::Cell;

use crate::engine::NodeId;
use crate::types::Value;

/// An event travelling through the live structure.
///
/// Targets are filled in during dispatch, which is why they are cells.
#[derive(Debug)]
pub struct Event {
    event_type: String,
    detail: Vec<Value>,
    bubbles: bool,
    target: Cell<Option<NodeId>>,
    current_target: Cell<Option<NodeId>>,
    delegate_target: Cell<Option<NodeId>>,
    propagation_stopped: Cell<bool>,
    default_prevented: Cell<bool>,
}

impl Event {
    /// A bubbling event with no detail.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            detail: Vec::new(),
            bubbles: true,
            target: Cell::new(None),
            current_target: Cell::new(None),
            delegate_target: Cell::new(None),
            propagation_stopped: Cell::new(false),
            default_prevented: Cell::new(false),
        }
    }

    /// A bubbling event carrying emitter arguments.
    pub fn custom(event_type: impl Into<String>, detail: Vec<Value>) -> Self {
        Self::new(event_type).with_detail(detail)
    }

    pub fn with_detail(mut self, detail: Vec<Value>) -> Self {
        self.detail = detail;
        self
    }

    pub fn with_bubbles(mut self, bubbles: bool) -> Self {
        self.bubbles = bubbles;
        self
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn detail(&self) -> &[Value] {
        &self.detail
    }

    pub fn bubbles(&self) -> bool {
        self.bubbles
    }

    /// Node the event was dispatched at.
    pub fn target(&self) -> Option<NodeId> {
        self.target.get()
    }

    /// Delegation root currently handling the event.
    pub fn current_target(&self) -> Option<NodeId> {
        self.current_target.get()
    }

    /// Node the listener's selector matched (the root for selector-less listeners).
    pub fn delegate_target(&self) -> Option<NodeId> {
        self.delegate_target.get()
    }

    pub fn stop_propagation(&self) {
        self.propagation_stopped.set(true);
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped.get()
    }

    pub fn prevent_default(&self) {
        self.default_prevented.set(true);
    }

    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented.get()
    }

    pub(crate) fn set_target(&self, target: Option<NodeId>) {
        self.target.set(target);
    }
}
