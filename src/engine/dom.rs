//! Live Structure - The realized node tree patches are applied to.
//!
//! Nodes live in a thread-local arena, the way the component registry keeps
//! its indices: a slot vector plus a free pool for O(1) reuse. Each slot
//! carries a generation so a released `NodeId` can never alias a newer node.
//!
//! # API
//!
//! - `create_element(tag)` / `create_text(text)` - Allocate detached nodes
//! - `append_child`, `insert_child`, `replace_node`, `detach` - Tree edits
//! - `release(node)` - Free a node and its whole subtree
//! - `inner_html`, `outer_html`, `text_content` - Serialization
//! - `query_selector`, `query_selector_all` - Selector lookups
//!
//! # Example
//!
//! ```ignore
//! use hyperd::engine::dom;
//!
//! let root = dom::create_element("div");
//! let text = dom::create_text("hi");
//! dom::append_child(root, text)?;
//! assert_eq!(dom::inner_html(root), "hi");
//! ```

use std::cell::RefCell;
use std::fmt;

use indexmap::IndexMap;

use super::selector::Selector;
use crate::error::{Error, Result};

/// Ordered attribute map of an element.
pub type Attributes = IndexMap<String, String>;

/// Elements that never have children and serialize without a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Whether `tag` is an HTML void element.
pub fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.iter().any(|void| void.eq_ignore_ascii_case(tag))
}

// =============================================================================
// Types
// =============================================================================

/// Handle to a node in the live structure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: usize,
    generation: u32,
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

/// What a live node is.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    Element { tag: String, attributes: Attributes },
    Text(String),
}

struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

struct Slot {
    generation: u32,
    node: Option<NodeData>,
}

// =============================================================================
// Document Arena
// =============================================================================

#[derive(Default)]
struct Document {
    slots: Vec<Slot>,
    free: Vec<usize>,
    live: usize,
}

impl Document {
    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let data = NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        };
        self.live += 1;

        // Reuse free slot or grow
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index];
            slot.node = Some(data);
            NodeId {
                index,
                generation: slot.generation,
            }
        } else {
            self.slots.push(Slot {
                generation: 0,
                node: Some(data),
            });
            NodeId {
                index: self.slots.len() - 1,
                generation: 0,
            }
        }
    }

    fn get(&self, id: NodeId) -> Option<&NodeData> {
        self.slots
            .get(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.slots
            .get_mut(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    fn node(&self, id: NodeId) -> Result<&NodeData> {
        self.get(id).ok_or(Error::StaleNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut NodeData> {
        self.get_mut(id).ok_or(Error::StaleNode(id))
    }

    fn element_mut(&mut self, id: NodeId) -> Result<(&mut String, &mut Attributes)> {
        match &mut self.node_mut(id)?.kind {
            NodeKind::Element { tag, attributes } => Ok((tag, attributes)),
            NodeKind::Text(_) => Err(Error::NotAnElement(id)),
        }
    }

    /// True if `ancestor` is `node` or one of its ancestors.
    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.get(id).and_then(|n| n.parent);
        }
        false
    }

    fn detach(&mut self, id: NodeId) -> Result<()> {
        let parent = self.node(id)?.parent;
        if let Some(parent) = parent {
            if let Some(parent_node) = self.get_mut(parent) {
                parent_node.children.retain(|child| *child != id);
            }
        }
        self.node_mut(id)?.parent = None;
        Ok(())
    }

    fn insert(&mut self, parent: NodeId, index: Option<usize>, child: NodeId) -> Result<()> {
        if !matches!(self.node(parent)?.kind, NodeKind::Element { .. }) {
            return Err(Error::NotAnElement(parent));
        }
        self.node(child)?;
        if self.contains(child, parent) {
            return Err(Error::Cycle { parent, child });
        }

        self.detach(child)?;
        let parent_node = self.node_mut(parent)?;
        match index {
            Some(index) if index < parent_node.children.len() => {
                parent_node.children.insert(index, child)
            }
            _ => parent_node.children.push(child),
        }
        self.node_mut(child)?.parent = Some(parent);
        Ok(())
    }

    fn free_subtree(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(slot) = self.slots.get_mut(current.index) else {
                continue;
            };
            if slot.generation != current.generation {
                continue;
            }
            if let Some(node) = slot.node.take() {
                stack.extend(node.children);
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(current.index);
                self.live -= 1;
            }
        }
    }

    fn text_content(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.get(id) else { return };
        match &node.kind {
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Element { .. } => {
                for child in &node.children {
                    self.text_content(*child, out);
                }
            }
        }
    }

    fn write_html(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.get(id) else { return };
        match &node.kind {
            NodeKind::Text(text) => escape_into(text, false, out),
            NodeKind::Element { tag, attributes } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attributes {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    escape_into(value, true, out);
                    out.push('"');
                }
                out.push('>');
                if is_void_element(tag) && node.children.is_empty() {
                    return;
                }
                for child in &node.children {
                    self.write_html(*child, out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }
}

fn escape_into(text: &str, attribute: bool, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}

thread_local! {
    static DOCUMENT: RefCell<Document> = RefCell::new(Document::default());
}

// =============================================================================
// Creation and Release
// =============================================================================

/// Create a detached element node.
pub fn create_element(tag: &str) -> NodeId {
    DOCUMENT.with(|doc| {
        doc.borrow_mut().alloc(NodeKind::Element {
            tag: tag.to_ascii_lowercase(),
            attributes: Attributes::new(),
        })
    })
}

/// Create a detached text node.
pub fn create_text(text: &str) -> NodeId {
    DOCUMENT.with(|doc| doc.borrow_mut().alloc(NodeKind::Text(text.to_string())))
}

/// Detach a node and free it together with its whole subtree.
///
/// Releasing an already released node is a no-op.
pub fn release(id: NodeId) {
    DOCUMENT.with(|doc| {
        let mut doc = doc.borrow_mut();
        if doc.get(id).is_none() {
            return;
        }
        let _ = doc.detach(id);
        doc.free_subtree(id);
    })
}

// =============================================================================
// Tree Edits
// =============================================================================

/// Append `child` as the last child of `parent`, moving it if attached elsewhere.
pub fn append_child(parent: NodeId, child: NodeId) -> Result<()> {
    DOCUMENT.with(|doc| doc.borrow_mut().insert(parent, None, child))
}

/// Insert `child` at `index` among `parent`'s children (appends when out of range).
pub fn insert_child(parent: NodeId, index: usize, child: NodeId) -> Result<()> {
    DOCUMENT.with(|doc| doc.borrow_mut().insert(parent, Some(index), child))
}

/// Remove a node from its parent. The node stays allocated.
pub fn detach(id: NodeId) -> Result<()> {
    DOCUMENT.with(|doc| doc.borrow_mut().detach(id))
}

/// Put `new` where `old` is. `old` ends up detached but allocated.
///
/// When `old` has no parent this only detaches `new`.
pub fn replace_node(old: NodeId, new: NodeId) -> Result<()> {
    DOCUMENT.with(|doc| {
        let mut doc = doc.borrow_mut();
        doc.node(new)?;
        let Some(parent) = doc.node(old)?.parent else {
            return doc.detach(new);
        };
        if old == new {
            return Ok(());
        }

        doc.detach(new)?;
        let parent_node = doc.node_mut(parent)?;
        if let Some(slot) = parent_node.children.iter_mut().find(|child| **child == old) {
            *slot = new;
        }
        doc.node_mut(new)?.parent = Some(parent);
        doc.node_mut(old)?.parent = None;
        Ok(())
    })
}

/// Set an attribute on an element.
pub fn set_attribute(id: NodeId, name: &str, value: &str) -> Result<()> {
    DOCUMENT.with(|doc| {
        let mut doc = doc.borrow_mut();
        let (_, attributes) = doc.element_mut(id)?;
        attributes.insert(name.to_string(), value.to_string());
        Ok(())
    })
}

/// Remove an attribute from an element.
pub fn remove_attribute(id: NodeId, name: &str) -> Result<()> {
    DOCUMENT.with(|doc| {
        let mut doc = doc.borrow_mut();
        let (_, attributes) = doc.element_mut(id)?;
        attributes.shift_remove(name);
        Ok(())
    })
}

/// Set the text of a node.
///
/// Text nodes change their content; elements have their children replaced
/// by a single text node.
pub fn set_text(id: NodeId, text: &str) -> Result<()> {
    let is_text = DOCUMENT.with(|doc| -> Result<bool> {
        let mut doc = doc.borrow_mut();
        match &mut doc.node_mut(id)?.kind {
            NodeKind::Text(content) => {
                *content = text.to_string();
                Ok(true)
            }
            NodeKind::Element { .. } => Ok(false),
        }
    })?;
    if is_text {
        return Ok(());
    }

    for child in children(id) {
        release(child);
    }
    let text_node = create_text(text);
    append_child(id, text_node)
}

// =============================================================================
// Lookups
// =============================================================================

/// Check whether a node is still allocated.
pub fn exists(id: NodeId) -> bool {
    DOCUMENT.with(|doc| doc.borrow().get(id).is_some())
}

/// Get a copy of the node's kind.
pub fn kind(id: NodeId) -> Option<NodeKind> {
    DOCUMENT.with(|doc| doc.borrow().get(id).map(|node| node.kind.clone()))
}

/// Lowercase tag name of an element, `None` for text or stale nodes.
pub fn tag_name(id: NodeId) -> Option<String> {
    DOCUMENT.with(|doc| match doc.borrow().get(id).map(|node| &node.kind) {
        Some(NodeKind::Element { tag, .. }) => Some(tag.clone()),
        _ => None,
    })
}

/// Get an attribute value.
pub fn attribute(id: NodeId, name: &str) -> Option<String> {
    DOCUMENT.with(|doc| match doc.borrow().get(id).map(|node| &node.kind) {
        Some(NodeKind::Element { attributes, .. }) => attributes.get(name).cloned(),
        _ => None,
    })
}

/// Run `f` against an element's tag and attributes without copying them.
pub fn with_element<R>(id: NodeId, f: impl FnOnce(&str, &Attributes) -> R) -> Option<R> {
    DOCUMENT.with(|doc| match doc.borrow().get(id).map(|node| &node.kind) {
        Some(NodeKind::Element { tag, attributes }) => Some(f(tag, attributes)),
        _ => None,
    })
}

/// Parent of a node.
pub fn parent(id: NodeId) -> Option<NodeId> {
    DOCUMENT.with(|doc| doc.borrow().get(id).and_then(|node| node.parent))
}

/// Children of a node, in order.
pub fn children(id: NodeId) -> Vec<NodeId> {
    DOCUMENT.with(|doc| {
        doc.borrow()
            .get(id)
            .map(|node| node.children.clone())
            .unwrap_or_default()
    })
}

/// Child at `index`.
pub fn child_at(id: NodeId, index: usize) -> Option<NodeId> {
    DOCUMENT.with(|doc| {
        doc.borrow()
            .get(id)
            .and_then(|node| node.children.get(index).copied())
    })
}

/// True if `ancestor` is `node` itself or one of its ancestors.
pub fn contains(ancestor: NodeId, node: NodeId) -> bool {
    DOCUMENT.with(|doc| doc.borrow().contains(ancestor, node))
}

/// Number of allocated nodes.
pub fn node_count() -> usize {
    DOCUMENT.with(|doc| doc.borrow().live)
}

// =============================================================================
// Serialization
// =============================================================================

/// Concatenated text of a node and its descendants.
pub fn text_content(id: NodeId) -> String {
    let mut out = String::new();
    DOCUMENT.with(|doc| doc.borrow().text_content(id, &mut out));
    out
}

/// Markup of a node's children.
pub fn inner_html(id: NodeId) -> String {
    let mut out = String::new();
    DOCUMENT.with(|doc| {
        let doc = doc.borrow();
        if let Some(node) = doc.get(id) {
            for child in &node.children {
                doc.write_html(*child, &mut out);
            }
        }
    });
    out
}

/// Markup of a node including itself.
pub fn outer_html(id: NodeId) -> String {
    let mut out = String::new();
    DOCUMENT.with(|doc| doc.borrow().write_html(id, &mut out));
    out
}

// =============================================================================
// Selector Queries
// =============================================================================

/// First descendant of `root` (in document order) matching `selector`.
pub fn query_selector(root: NodeId, selector: &str) -> Result<Option<NodeId>> {
    let selector = Selector::parse(selector)?;
    Ok(descendants(root)
        .into_iter()
        .find(|node| selector.matches(*node)))
}

/// All descendants of `root` (in document order) matching `selector`.
pub fn query_selector_all(root: NodeId, selector: &str) -> Result<Vec<NodeId>> {
    let selector = Selector::parse(selector)?;
    Ok(descendants(root)
        .into_iter()
        .filter(|node| selector.matches(*node))
        .collect())
}

fn descendants(root: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut stack: Vec<NodeId> = children(root).into_iter().rev().collect();
    while let Some(node) = stack.pop() {
        out.push(node);
        stack.extend(children(node).into_iter().rev());
    }
    out
}

// =============================================================================
// Reset (for testing)
// =============================================================================

/// Drop every node in this thread's document.
pub fn reset_document() {
    DOCUMENT.with(|doc| *doc.borrow_mut() = Document::default());
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn element_with_text(tag: &str, text: &str) -> NodeId {
        let element = create_element(tag);
        let text_node = create_text(text);
        append_child(element, text_node).unwrap();
        element
    }

    #[test]
    fn test_append_and_serialize() {
        reset_document();

        let root = create_element("DIV");
        let span = element_with_text("span", "hi");
        set_attribute(span, "class", "greeting").unwrap();
        append_child(root, span).unwrap();

        assert_eq!(tag_name(root).as_deref(), Some("div"), "tags are lowercased");
        assert_eq!(inner_html(root), "<span class=\"greeting\">hi</span>");
        assert_eq!(
            outer_html(root),
            "<div><span class=\"greeting\">hi</span></div>"
        );
        assert_eq!(text_content(root), "hi");
    }

    #[test]
    fn test_escaping() {
        reset_document();

        let root = element_with_text("p", "a < b & c");
        set_attribute(root, "title", "say \"hi\"").unwrap();
        assert_eq!(
            outer_html(root),
            "<p title=\"say &quot;hi&quot;\">a &lt; b &amp; c</p>"
        );
    }

    #[test]
    fn test_void_elements_serialize_without_close() {
        reset_document();

        let root = create_element("div");
        let br = create_element("br");
        append_child(root, br).unwrap();
        assert_eq!(inner_html(root), "<br>");
    }

    #[test]
    fn test_release_frees_subtree_and_reuses_slots() {
        reset_document();

        let root = create_element("div");
        let child = element_with_text("span", "x");
        append_child(root, child).unwrap();
        assert_eq!(node_count(), 3);

        release(child);
        assert_eq!(node_count(), 1, "span and its text are freed");
        assert!(!exists(child));
        assert!(children(root).is_empty());

        // Slot is reused with a new generation
        let fresh = create_element("b");
        assert!(exists(fresh));
        assert!(!exists(child), "stale id must not alias the new node");
        assert_eq!(set_attribute(child, "a", "b").err().map(|e| e.to_string()),
            Some(format!("node {} no longer exists", child)));
    }

    #[test]
    fn test_replace_node_keeps_position() {
        reset_document();

        let root = create_element("ul");
        let a = create_element("li");
        let b = create_element("li");
        let c = create_element("li");
        for node in [a, b, c] {
            append_child(root, node).unwrap();
        }

        let replacement = create_element("p");
        replace_node(b, replacement).unwrap();
        assert_eq!(children(root), vec![a, replacement, c]);
        assert_eq!(parent(b), None);
        assert_eq!(parent(replacement), Some(root));
    }

    #[test]
    fn test_append_moves_node() {
        reset_document();

        let first = create_element("div");
        let second = create_element("div");
        let child = create_element("span");
        append_child(first, child).unwrap();
        append_child(second, child).unwrap();

        assert!(children(first).is_empty());
        assert_eq!(children(second), vec![child]);
    }

    #[test]
    fn test_append_rejects_cycles() {
        reset_document();

        let outer = create_element("div");
        let inner = create_element("div");
        append_child(outer, inner).unwrap();
        assert!(append_child(inner, outer).is_err());
    }

    #[test]
    fn test_set_text_on_element_replaces_children() {
        reset_document();

        let root = element_with_text("div", "old");
        let extra = create_element("span");
        append_child(root, extra).unwrap();

        set_text(root, "new").unwrap();
        assert_eq!(inner_html(root), "new");
        assert!(!exists(extra));
    }

    #[test]
    fn test_query_selector() {
        reset_document();

        let root = create_element("div");
        let first = element_with_text("button", "a");
        let second = element_with_text("button", "b");
        set_attribute(second, "class", "primary").unwrap();
        append_child(root, first).unwrap();
        append_child(root, second).unwrap();

        assert_eq!(query_selector(root, "button").unwrap(), Some(first));
        assert_eq!(query_selector(root, "button.primary").unwrap(), Some(second));
        assert_eq!(query_selector_all(root, "button").unwrap().len(), 2);
        assert_eq!(query_selector(root, "input").unwrap(), None);
    }
}
