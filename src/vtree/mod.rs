//! Virtual Tree - Snapshots of rendered output and the patches between them.
//!
//! # Pipeline
//!
//! ```text
//! markup ──parse──→ VNode ──inflate──→ VNode (with Widgets)
//!                                        │
//!            previous VNode ──diff───────┤
//!                                        ▼
//!                                      Patch ──apply──→ live NodeId
//! ```
//!
//! - [`parse`] turns trimmed markup into a single-rooted snapshot
//! - [`diff`] compares two snapshots position by position
//! - [`apply`] mutates the live structure, creating, updating and destroying
//!   embedded widgets on the way
//! - [`create`] realizes a snapshot from scratch (first render)
//! - [`snapshot`] reads a snapshot back from existing live content

mod diff;
mod parse;
mod patch;

pub use diff::{Patch, PatchKinds, PatchOp, diff};
pub use parse::{ParseError, parse};
pub use patch::{apply, create, destroy_widgets, snapshot};

use indexmap::IndexMap;

use crate::component::Widget;

/// Ordered element properties (attributes).
pub type Properties = IndexMap<String, String>;

/// One node of a snapshot.
#[derive(Clone, Debug, PartialEq)]
pub enum VNode {
    Element(VElement),
    Text(String),
    /// An embedded component placed by inflation.
    Widget(Widget),
}

/// An element snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct VElement {
    pub tag: String,
    pub properties: Properties,
    pub children: Vec<VNode>,
}

impl VNode {
    /// Build an element node. The tag is lowercased.
    pub fn element(tag: &str, properties: Properties, children: Vec<VNode>) -> Self {
        VNode::Element(VElement {
            tag: tag.to_ascii_lowercase(),
            properties,
            children,
        })
    }

    /// Build a text node.
    pub fn text(text: impl Into<String>) -> Self {
        VNode::Text(text.into())
    }

    /// Tag of an element node.
    pub fn tag(&self) -> Option<&str> {
        match self {
            VNode::Element(element) => Some(&element.tag),
            _ => None,
        }
    }

    /// Children of an element node, empty otherwise.
    pub fn children(&self) -> &[VNode] {
        match self {
            VNode::Element(element) => &element.children,
            _ => &[],
        }
    }

    /// Visit every widget in this subtree, in document order.
    pub fn for_each_widget(&self, f: &mut impl FnMut(&Widget)) {
        match self {
            VNode::Widget(widget) => f(widget),
            VNode::Element(element) => {
                for child in &element.children {
                    child.for_each_widget(f);
                }
            }
            VNode::Text(_) => {}
        }
    }
}
