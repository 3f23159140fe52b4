//! Snapshot diffing.
//!
//! Children are compared by position, not by key. Ops are ordered so they
//! can be applied front to back against the live structure: trailing
//! removals come last and highest index first, so earlier paths stay valid.

use bitflags::bitflags;

use super::{Properties, VNode};
use crate::component::Widget;

bitflags! {
    /// Which kinds of mutation a patch performs.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PatchKinds: u8 {
        const TEXT    = 1 << 0;
        const PROPS   = 1 << 1;
        const INSERT  = 1 << 2;
        const REMOVE  = 1 << 3;
        const REPLACE = 1 << 4;
        const WIDGET  = 1 << 5;
    }
}

/// One step of a patch. Paths are child indices from the root.
#[derive(Clone, Debug)]
pub enum PatchOp {
    /// Change the content of a text node.
    Text { path: Vec<usize>, text: String },
    /// Set and remove element properties.
    Props {
        path: Vec<usize>,
        set: Vec<(String, String)>,
        remove: Vec<String>,
    },
    /// Realize `node` and append it to the element at `path`.
    Insert { path: Vec<usize>, node: VNode },
    /// Destroy the widgets under `node` and remove it.
    Remove { path: Vec<usize>, node: VNode },
    /// Swap the node at `path` for a freshly realized one.
    Replace {
        path: Vec<usize>,
        old: VNode,
        new: VNode,
    },
    /// Hand the child component to `next` and give it new props.
    Widget {
        path: Vec<usize>,
        previous: Widget,
        next: Widget,
    },
    /// Hand the child component to `next` and let it check its own data.
    Adopt {
        path: Vec<usize>,
        previous: Widget,
        next: Widget,
    },
}

impl PatchOp {
    fn kind(&self) -> PatchKinds {
        match self {
            PatchOp::Text { .. } => PatchKinds::TEXT,
            PatchOp::Props { .. } => PatchKinds::PROPS,
            PatchOp::Insert { .. } => PatchKinds::INSERT,
            PatchOp::Remove { .. } => PatchKinds::REMOVE,
            PatchOp::Replace { .. } => PatchKinds::REPLACE,
            PatchOp::Widget { .. } => PatchKinds::WIDGET,
            PatchOp::Adopt { .. } => PatchKinds::empty(),
        }
    }
}

/// The ordered ops turning one snapshot into another.
#[derive(Clone, Debug, Default)]
pub struct Patch {
    ops: Vec<PatchOp>,
}

impl Patch {
    pub fn ops(&self) -> &[PatchOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// True when the patch changes nothing at this level.
    ///
    /// Adopted widgets don't count, although their children may still
    /// re-render themselves while it is applied.
    pub fn is_empty(&self) -> bool {
        self.kinds().is_empty()
    }

    pub fn kinds(&self) -> PatchKinds {
        self.ops
            .iter()
            .fold(PatchKinds::empty(), |kinds, op| kinds | op.kind())
    }
}

/// Compute the patch from `old` to `new`.
pub fn diff(old: &VNode, new: &VNode) -> Patch {
    let mut ops = Vec::new();
    let mut path = Vec::new();
    diff_node(old, new, &mut path, &mut ops);
    Patch { ops }
}

fn diff_node(old: &VNode, new: &VNode, path: &mut Vec<usize>, ops: &mut Vec<PatchOp>) {
    match (old, new) {
        (VNode::Text(a), VNode::Text(b)) => {
            if a != b {
                ops.push(PatchOp::Text {
                    path: path.clone(),
                    text: b.clone(),
                });
            }
        }
        (VNode::Element(a), VNode::Element(b)) if a.tag == b.tag => {
            diff_properties(&a.properties, &b.properties, path, ops);
            diff_children(&a.children, &b.children, path, ops);
        }
        (VNode::Widget(a), VNode::Widget(b)) if a.same_class(b) => {
            if a.properties() == b.properties() {
                ops.push(PatchOp::Adopt {
                    path: path.clone(),
                    previous: a.clone(),
                    next: b.clone(),
                });
            } else {
                ops.push(PatchOp::Widget {
                    path: path.clone(),
                    previous: a.clone(),
                    next: b.clone(),
                });
            }
        }
        _ => ops.push(PatchOp::Replace {
            path: path.clone(),
            old: old.clone(),
            new: new.clone(),
        }),
    }
}

fn diff_properties(old: &Properties, new: &Properties, path: &[usize], ops: &mut Vec<PatchOp>) {
    let set: Vec<(String, String)> = new
        .iter()
        .filter(|(name, value)| old.get(*name) != Some(*value))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();
    let remove: Vec<String> = old
        .keys()
        .filter(|name| !new.contains_key(*name))
        .cloned()
        .collect();

    if !set.is_empty() || !remove.is_empty() {
        ops.push(PatchOp::Props {
            path: path.to_vec(),
            set,
            remove,
        });
    }
}

fn diff_children(old: &[VNode], new: &[VNode], path: &mut Vec<usize>, ops: &mut Vec<PatchOp>) {
    let shared = old.len().min(new.len());

    for index in 0..shared {
        path.push(index);
        diff_node(&old[index], &new[index], path, ops);
        path.pop();
    }

    for node in &new[shared..] {
        ops.push(PatchOp::Insert {
            path: path.clone(),
            node: node.clone(),
        });
    }

    for index in (shared..old.len()).rev() {
        path.push(index);
        ops.push(PatchOp::Remove {
            path: path.clone(),
            node: old[index].clone(),
        });
        path.pop();
    }
}

// =============================================================================
// Tests
// =============================================================================
