//! Delegation scopes and bubbling dispatch.
//!
//! Every component owns one scope. A scope is bound to the component's root
//! node and holds listeners keyed by event type and optional selector. When
//! an event bubbles through a scope's root, selector listeners fire once for
//! each node between the target and the root (root excluded) that matches,
//! innermost first. Listeners without a selector fire for the root itself.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use super::Event;
use crate::engine::{NodeId, Selector, dom};
use crate::error::Result;
use crate::types::ListenerId;

/// Delegated event handler.
pub type Handler = Rc<dyn Fn(&Event)>;

struct Entry {
    id: ListenerId,
    event_type: String,
    selector: Option<Selector>,
    handler: Handler,
}

#[derive(Default)]
struct Scope {
    root: Option<NodeId>,
    entries: Vec<Entry>,
}

#[derive(Default)]
struct ScopeRegistry {
    // Ordered by creation so dispatch order is stable
    scopes: BTreeMap<u64, Scope>,
    next_id: u64,
}

thread_local! {
    static REGISTRY: RefCell<ScopeRegistry> = RefCell::new(ScopeRegistry::default());
}

// =============================================================================
// Delegate
// =============================================================================

/// Handle to one delegation scope. Dropping it removes the scope and all of
/// its listeners.
pub struct Delegate {
    scope: u64,
}

impl Delegate {
    /// Open a new, unbound scope.
    pub fn new() -> Self {
        let scope = REGISTRY.with(|reg| {
            let mut reg = reg.borrow_mut();
            let id = reg.next_id;
            reg.next_id += 1;
            reg.scopes.insert(id, Scope::default());
            id
        });
        Self { scope }
    }

    /// Bind (or rebind) the scope to a root. Listeners are kept.
    pub fn root(&self, root: Option<NodeId>) {
        self.with_scope(|scope| scope.root = root);
    }

    /// The node the scope is bound to.
    pub fn root_node(&self) -> Option<NodeId> {
        self.with_scope(|scope| scope.root).flatten()
    }

    /// Register a listener. With a selector, the listener fires for matching
    /// descendants of the root; without one, for the root itself.
    pub fn on(&self, event_type: &str, selector: Option<&str>, handler: Handler) -> Result<ListenerId> {
        let selector = selector.map(Selector::parse).transpose()?;
        let id = ListenerId::next();
        self.with_scope(|scope| {
            scope.entries.push(Entry {
                id,
                event_type: event_type.to_string(),
                selector,
                handler,
            })
        });
        Ok(id)
    }

    /// Remove listeners. Every given filter must match; `None` matches anything.
    ///
    /// Returns how many listeners were removed.
    pub fn off(&self, event_type: Option<&str>, selector: Option<&str>, id: Option<ListenerId>) -> usize {
        let selector = selector.map(str::trim);
        self.with_scope(|scope| {
            let before = scope.entries.len();
            scope.entries.retain(|entry| {
                let matches = event_type.is_none_or(|t| entry.event_type == t)
                    && selector.is_none_or(|s| entry.selector.as_ref().map(Selector::source) == Some(s))
                    && id.is_none_or(|id| entry.id == id);
                !matches
            });
            before - scope.entries.len()
        })
        .unwrap_or(0)
    }

    /// Number of listeners in the scope.
    pub fn listener_count(&self) -> usize {
        self.with_scope(|scope| scope.entries.len()).unwrap_or(0)
    }

    fn with_scope<R>(&self, f: impl FnOnce(&mut Scope) -> R) -> Option<R> {
        REGISTRY.with(|reg| reg.borrow_mut().scopes.get_mut(&self.scope).map(f))
    }
}

impl Default for Delegate {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Delegate {
    fn drop(&mut self) {
        // try_with: the registry may already be gone during thread teardown
        let _ = REGISTRY.try_with(|reg| {
            if let Ok(mut reg) = reg.try_borrow_mut() {
                reg.scopes.remove(&self.scope);
            }
        });
    }
}

// =============================================================================
// Dispatch
// =============================================================================

/// Dispatch `event` at `target`, bubbling through every ancestor.
///
/// Returns the number of handler invocations.
pub fn dispatch(target: NodeId, event: &Event) -> usize {
    event.set_target(Some(target));

    // target, parent, grandparent, ...
    let mut path = vec![target];
    while let Some(parent) = path.last().copied().and_then(dom::parent) {
        path.push(parent);
    }

    let mut invoked = 0;
    for (depth, &node) in path.iter().enumerate() {
        if (depth > 0 && !event.bubbles()) || event.is_propagation_stopped() {
            break;
        }

        // Clone out so handlers may register or remove listeners
        let listeners: Vec<(Option<Selector>, Handler)> = REGISTRY.with(|reg| {
            reg.borrow()
                .scopes
                .values()
                .filter(|scope| scope.root == Some(node))
                .flat_map(|scope| scope.entries.iter())
                .filter(|entry| entry.event_type == event.event_type())
                .map(|entry| (entry.selector.clone(), entry.handler.clone()))
                .collect()
        });
        if listeners.is_empty() {
            continue;
        }

        event.current_target.set(Some(node));
        for (selector, handler) in listeners {
            match selector {
                None => {
                    event.delegate_target.set(Some(node));
                    handler(event);
                    invoked += 1;
                }
                Some(selector) => {
                    for &candidate in &path[..depth] {
                        if selector.matches(candidate) {
                            event.delegate_target.set(Some(candidate));
                            handler(event);
                            invoked += 1;
                            if event.is_propagation_stopped() {
                                break;
                            }
                        }
                    }
                }
            }
            if event.is_propagation_stopped() {
                break;
            }
        }
    }

    tracing::trace!(event = event.event_type(), %target, invoked, "event dispatched");
    invoked
}

// =============================================================================
// Reset (for testing)
// =============================================================================

/// Drop every scope. Existing `Delegate` handles become inert.
pub fn reset_delegates() {
    REGISTRY.with(|reg| reg.borrow_mut().scopes.clear());
}

// =============================================================================
// Tests
// =============================================================================
