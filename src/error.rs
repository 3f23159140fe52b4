//! Error types for the hyperd runtime.

use thiserror::Error;

use crate::engine::NodeId;
use crate::types::ComponentId;
use crate::vtree::ParseError;

/// Errors returned by component, tree and host operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A public operation was invoked on a destroyed component.
    #[error("component {0} has been destroyed")]
    Destroyed(ComponentId),

    /// `attach_to` was called on a component that already has a live node.
    #[error("component {0} is already attached")]
    AlreadyAttached(ComponentId),

    /// The operation needs a live node and the component has none yet.
    #[error("component {0} has no live node")]
    NotAttached(ComponentId),

    /// The component class was never given a render operation.
    #[error("component class `{0}` has no render operation")]
    MissingRender(String),

    /// Render output is not well-formed markup.
    #[error("render output could not be parsed: {0}")]
    Parse(#[from] ParseError),

    /// A delegation selector could not be parsed.
    #[error("invalid selector `{0}`")]
    Selector(String),

    /// The node was released or never existed.
    #[error("node {0} no longer exists")]
    StaleNode(NodeId),

    /// The node is a text node where an element was required.
    #[error("node {0} is not an element")]
    NotAnElement(NodeId),

    /// Inserting the node would make it its own ancestor.
    #[error("inserting {child} under {parent} would create a cycle")]
    Cycle { parent: NodeId, child: NodeId },

    /// A widget was asked to hand over a component it never owned.
    #[error("widget for `{0}` was never initialized")]
    WidgetUninitialized(String),

    /// A patch addressed a position the live structure does not have.
    #[error("patch path {0:?} does not resolve against the live structure")]
    BadPath(Vec<usize>),

    /// Terminal I/O failed.
    #[error("terminal I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for hyperd operations.
pub type Result<T> = std::result::Result<T, Error>;
