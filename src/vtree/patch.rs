//! Realizing snapshots and applying patches to the live structure.

use super::diff::{Patch, PatchOp};
use super::{Properties, VNode};
use crate::component::Widget;
use crate::engine::dom::{self, NodeId, NodeKind};
use crate::error::{Error, Result};

// =============================================================================
// Create
// =============================================================================

/// Realize a snapshot as a new detached live subtree.
///
/// Widgets are initialized on the way, so their components render and
/// their roots become part of the result. On failure everything created so
/// far is torn down again.
pub fn create(vnode: &VNode) -> Result<NodeId> {
    match vnode {
        VNode::Text(text) => Ok(dom::create_text(text)),
        VNode::Widget(widget) => widget.init(),
        VNode::Element(element) => {
            let node = dom::create_element(&element.tag);
            if let Err(err) = populate(node, &element.properties, &element.children) {
                destroy_widgets(vnode);
                dom::release(node);
                return Err(err);
            }
            Ok(node)
        }
    }
}

fn populate(node: NodeId, properties: &Properties, children: &[VNode]) -> Result<()> {
    for (name, value) in properties {
        dom::set_attribute(node, name, value)?;
    }
    for child in children {
        let child_node = create(child)?;
        dom::append_child(node, child_node)?;
    }
    Ok(())
}

/// Destroy every widget in a subtree that is leaving the live structure.
pub fn destroy_widgets(vnode: &VNode) {
    vnode.for_each_widget(&mut |widget| widget.destroy());
}

// =============================================================================
// Apply
// =============================================================================

/// Apply `patch` to the live subtree rooted at `root`.
///
/// Returns the root afterwards. It differs from `root` when the root itself
/// was replaced; the old root is then detached but left allocated so the
/// caller can decide whether to release it.
pub fn apply(root: NodeId, patch: &Patch) -> Result<NodeId> {
    let mut root = root;

    for op in patch.ops() {
        match op {
            PatchOp::Text { path, text } => {
                dom::set_text(resolve(root, path)?, text)?;
            }
            PatchOp::Props { path, set, remove } => {
                let node = resolve(root, path)?;
                for (name, value) in set {
                    dom::set_attribute(node, name, value)?;
                }
                for name in remove {
                    dom::remove_attribute(node, name)?;
                }
            }
            PatchOp::Insert { path, node } => {
                let parent = resolve(root, path)?;
                let child = create(node)?;
                dom::append_child(parent, child)?;
            }
            PatchOp::Remove { path, node } => {
                let target = resolve(root, path)?;
                destroy_widgets(node);
                dom::release(target);
            }
            PatchOp::Replace { path, old, new } => {
                let target = resolve(root, path)?;
                let fresh = create(new)?;
                dom::replace_node(target, fresh)?;
                // After the swap, so a child owning `target` may release it
                destroy_widgets(old);
                if path.is_empty() {
                    root = fresh;
                } else {
                    dom::release(target);
                }
            }
            PatchOp::Widget {
                path,
                previous,
                next,
            } => {
                resolve(root, path)?;
                next.update(previous)?;
                root = widget_root(root, path, next);
            }
            PatchOp::Adopt {
                path,
                previous,
                next,
            } => {
                resolve(root, path)?;
                next.adopt(previous)?;
                root = widget_root(root, path, next);
            }
        }
    }

    Ok(root)
}

/// A child at the root may have swapped its own root while ticking.
fn widget_root(root: NodeId, path: &[usize], widget: &Widget) -> NodeId {
    match (path.is_empty(), widget.node()) {
        (true, Some(node)) => node,
        _ => root,
    }
}

fn resolve(root: NodeId, path: &[usize]) -> Result<NodeId> {
    path.iter().try_fold(root, |node, &index| {
        dom::child_at(node, index).ok_or_else(|| Error::BadPath(path.to_vec()))
    })
}

// =============================================================================
// Snapshot
// =============================================================================

/// Read a snapshot of existing live content.
pub fn snapshot(node: NodeId) -> Result<VNode> {
    match dom::kind(node).ok_or(Error::StaleNode(node))? {
        NodeKind::Text(text) => Ok(VNode::Text(text)),
        NodeKind::Element { tag, attributes } => {
            let children = dom::children(node)
                .into_iter()
                .map(snapshot)
                .collect::<Result<Vec<_>>>()?;
            Ok(VNode::element(&tag, attributes, children))
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
