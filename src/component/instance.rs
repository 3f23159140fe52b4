//! Component instances: state, the render loop and lifecycle.
//!
//! # Tick
//!
//! ```text
//! clean? ──yes──→ tick children, done
//!   │no
//!   ▼
//! render → parse → inflate → diff/create → apply → remember data → on_render
//! ```
//!
//! An instance is dirty after construction, after `set_props` with
//! different props, or when its data differs from the data of its last
//! render. Data is compared by value, so mutating it in place through
//! [`Component::update_data`] is picked up on the next tick.
//!
//! # Ownership
//!
//! `Component` is a cheap handle over shared state. The pending frame
//! callback of an attached instance holds a handle, so the loop keeps
//! running after the caller drops theirs, until `destroy`.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use super::inflate::inflate;
use super::{ComponentClass, Widget};
use crate::engine::{FrameHandle, NodeId, dom, frame};
use crate::error::{Error, Result};
use crate::events::{self, Delegate, Event, Handler};
use crate::types::{ComponentId, ListenerId, Value, empty_object, normalize_props};
use crate::vtree::{self, VNode};

/// Listener for lifecycle and delegated events. Emitter arguments are in
/// [`Event::detail`].
pub type Listener = Rc<dyn Fn(&Component, &Event)>;

/// Instance status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Active,
    Destroyed,
}

/// Events an instance emits to its own listeners rather than through the
/// live structure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    Attach,
    Render,
    Destroy,
}

impl Lifecycle {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "attach" => Some(Self::Attach),
            "render" => Some(Self::Render),
            "destroy" => Some(Self::Destroy),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Attach => "attach",
            Self::Render => "render",
            Self::Destroy => "destroy",
        }
    }
}

struct State {
    id: ComponentId,
    class: ComponentClass,
    status: Status,
    props: Value,
    data: Value,
    /// Data as of the last render. `None` until the first render.
    rendered_data: Option<Value>,
    dirty: bool,
    tree: Option<VNode>,
    node: Option<NodeId>,
    /// Whether `node` was created by this instance (and may be released).
    owns_node: bool,
    widgets: Vec<Widget>,
    request: Option<FrameHandle>,
    delegate: Option<Delegate>,
    listeners: Vec<(ListenerId, Lifecycle, Listener)>,
    render_count: u64,
}

/// Handle to a component instance. Clones share state.
#[derive(Clone)]
pub struct Component {
    state: Rc<RefCell<State>>,
}

/// Non-owning handle to a component instance.
#[derive(Clone)]
pub struct WeakComponent {
    state: Weak<RefCell<State>>,
}

impl WeakComponent {
    pub fn upgrade(&self) -> Option<Component> {
        self.state.upgrade().map(|state| Component { state })
    }
}

impl Component {
    pub(crate) fn new(class: &ComponentClass, props: Option<Value>) -> Self {
        let id = ComponentId::next();
        let component = Self {
            state: Rc::new(RefCell::new(State {
                id,
                class: class.clone(),
                status: Status::Active,
                props: normalize_props(props),
                data: empty_object(),
                rendered_data: None,
                dirty: true,
                tree: None,
                node: None,
                owns_node: false,
                widgets: Vec::new(),
                request: None,
                delegate: Some(Delegate::new()),
                listeners: Vec::new(),
                render_count: 0,
            })),
        };

        for hook in class.setup_hooks() {
            hook(&component);
        }
        tracing::trace!(component = %id, class = class.name(), "component created");
        component
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn id(&self) -> ComponentId {
        self.state.borrow().id
    }

    pub fn class(&self) -> ComponentClass {
        self.state.borrow().class.clone()
    }

    pub fn status(&self) -> Status {
        self.state.borrow().status
    }

    pub fn is_destroyed(&self) -> bool {
        self.status() == Status::Destroyed
    }

    pub fn props(&self) -> Value {
        self.state.borrow().props.clone()
    }

    pub fn data(&self) -> Value {
        self.state.borrow().data.clone()
    }

    /// Read data without cloning. `f` must not call back into this instance.
    pub fn with_data<R>(&self, f: impl FnOnce(&Value) -> R) -> R {
        f(&self.state.borrow().data)
    }

    /// Replace data. Ignored after destroy.
    pub fn set_data(&self, data: Value) {
        self.update_data(|current| *current = data);
    }

    /// Mutate data in place. `f` must not call back into this instance.
    /// Ignored after destroy.
    pub fn update_data(&self, f: impl FnOnce(&mut Value)) {
        let mut state = self.state.borrow_mut();
        if state.status == Status::Destroyed {
            tracing::warn!(component = %state.id, "data change on destroyed component ignored");
            return;
        }
        f(&mut state.data);
    }

    /// The current root in the live structure.
    pub fn node(&self) -> Option<NodeId> {
        self.state.borrow().node
    }

    /// Snapshot of the last applied render.
    pub fn tree(&self) -> Option<VNode> {
        self.state.borrow().tree.clone()
    }

    /// Dirty flag as last computed. Data changes are only noticed by `tick`.
    pub fn is_dirty(&self) -> bool {
        self.state.borrow().dirty
    }

    pub fn render_count(&self) -> u64 {
        self.state.borrow().render_count
    }

    /// Child components embedded in the last render, in document order.
    pub fn children(&self) -> Vec<Component> {
        self.state
            .borrow()
            .widgets
            .iter()
            .filter_map(Widget::component)
            .collect()
    }

    pub fn downgrade(&self) -> WeakComponent {
        WeakComponent {
            state: Rc::downgrade(&self.state),
        }
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &Component) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }

    fn ensure_active(&self) -> Result<()> {
        let state = self.state.borrow();
        match state.status {
            Status::Active => Ok(()),
            Status::Destroyed => Err(Error::Destroyed(state.id)),
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Adopt `target`'s existing content as the current rendering and start
    /// the render loop.
    pub fn attach_to(&self, target: NodeId) -> Result<Component> {
        self.ensure_active()?;
        if self.node().is_some() {
            return Err(Error::AlreadyAttached(self.id()));
        }
        let tree = vtree::snapshot(target)?;

        {
            let mut state = self.state.borrow_mut();
            state.node = Some(target);
            state.tree = Some(tree);
            state.owns_node = false;
            if let Some(delegate) = &state.delegate {
                delegate.root(Some(target));
            }
            tracing::debug!(component = %state.id, node = %target, "attached");
        }

        self.notify_attached();
        if !self.is_destroyed() {
            self.schedule();
        }
        Ok(self.clone())
    }

    /// Replace props. The instance becomes dirty only if they differ.
    pub fn set_props(&self, props: Option<Value>) -> Result<()> {
        self.ensure_active()?;
        let props = normalize_props(props);
        let mut state = self.state.borrow_mut();
        state.dirty = state.props != props;
        state.props = props;
        Ok(())
    }

    /// Produce markup for the current props and data.
    pub fn render(&self) -> Result<String> {
        self.ensure_active()?;
        let class = self.class();
        let render = class
            .render_fn()
            .ok_or_else(|| Error::MissingRender(class.name().to_string()))?;
        Ok(render(self))
    }

    /// Re-render if dirty, otherwise let children check themselves.
    ///
    /// Returns whether this instance re-rendered.
    pub fn tick(&self) -> Result<bool> {
        self.ensure_active()?;

        if !self.refresh_dirty() {
            for child in self.children() {
                if !child.is_destroyed() {
                    child.tick()?;
                }
            }
            self.sync_root_widget();
            return Ok(false);
        }

        let markup = self.render()?;
        let mut widgets = Vec::new();
        let tree = inflate(vtree::parse(&markup)?, self.class().components(), &mut widgets);
        self.apply_tree(&tree)?;

        if self.is_destroyed() {
            // Torn down by a hook while the new tree was realized
            for widget in &widgets {
                widget.destroy();
            }
            return Ok(false);
        }

        {
            let mut state = self.state.borrow_mut();
            let state = &mut *state;
            state.rendered_data = Some(state.data.clone());
            state.tree = Some(tree);
            state.widgets = widgets;
            state.dirty = false;
            state.render_count += 1;
            tracing::trace!(
                component = %state.id,
                render_count = state.render_count,
                "rendered"
            );
        }

        if let Some(hook) = self.class().render_hook() {
            hook(self);
        }
        if !self.is_destroyed() {
            self.notify(Lifecycle::Render, Vec::new());
        }
        Ok(true)
    }

    /// Stop the loop, destroy children, run destroy hooks and listeners,
    /// then drop all state. Later calls do nothing.
    ///
    /// A root this instance created is released when nothing else holds it
    /// in the live structure. Roots inside a parent's subtree go with the
    /// parent's patch.
    pub fn destroy(&self) {
        let (id, request, widgets) = {
            let mut state = self.state.borrow_mut();
            if state.status == Status::Destroyed {
                return;
            }
            state.status = Status::Destroyed;
            (state.id, state.request.take(), std::mem::take(&mut state.widgets))
        };

        if let Some(request) = request {
            frame::cancel_frame(request);
        }
        for widget in &widgets {
            widget.destroy();
        }

        if let Some(hook) = self.class().destroy_hook() {
            hook(self);
        }
        self.notify(Lifecycle::Destroy, Vec::new());

        let (delegate, orphan) = {
            let mut state = self.state.borrow_mut();
            let orphan = match state.node {
                Some(node) if state.owns_node && dom::parent(node).is_none() => Some(node),
                _ => None,
            };
            state.listeners.clear();
            state.props = empty_object();
            state.data = empty_object();
            state.rendered_data = None;
            state.tree = None;
            state.node = None;
            state.owns_node = false;
            state.dirty = false;
            (state.delegate.take(), orphan)
        };
        // Dropping the scope unbinds every delegated listener
        drop(delegate);
        if let Some(node) = orphan {
            dom::release(node);
        }

        tracing::debug!(component = %id, "destroyed");
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// Register a listener.
    ///
    /// `attach`, `render` and `destroy` without a selector are lifecycle
    /// events delivered directly. Anything else is delegated: with a
    /// selector it fires for matching nodes inside the root, without one
    /// for the root itself.
    pub fn on(
        &self,
        event_type: &str,
        selector: Option<&str>,
        listener: impl Fn(&Component, &Event) + 'static,
    ) -> Result<ListenerId> {
        self.ensure_active()?;
        let listener: Listener = Rc::new(listener);

        if let (None, Some(lifecycle)) = (selector, Lifecycle::from_name(event_type)) {
            let id = ListenerId::next();
            self.state.borrow_mut().listeners.push((id, lifecycle, listener));
            return Ok(id);
        }

        let weak = self.downgrade();
        let handler: Handler = Rc::new(move |event: &Event| {
            if let Some(component) = weak.upgrade() {
                listener(&component, event);
            }
        });

        let state = self.state.borrow();
        let delegate = state.delegate.as_ref().ok_or(Error::Destroyed(state.id))?;
        delegate.on(event_type, selector, handler)
    }

    /// Remove one listener. Returns whether it was registered.
    pub fn remove_listener(&self, event_type: &str, selector: Option<&str>, id: ListenerId) -> Result<bool> {
        self.ensure_active()?;
        let mut state = self.state.borrow_mut();

        if let (None, Some(lifecycle)) = (selector, Lifecycle::from_name(event_type)) {
            let before = state.listeners.len();
            state
                .listeners
                .retain(|(listener_id, kind, _)| *listener_id != id || *kind != lifecycle);
            return Ok(state.listeners.len() != before);
        }

        let removed = state
            .delegate
            .as_ref()
            .map(|delegate| delegate.off(Some(event_type), selector, Some(id)))
            .unwrap_or(0);
        Ok(removed > 0)
    }

    /// Remove every listener matching the filters. Returns how many went.
    pub fn remove_all_listeners(&self, event_type: Option<&str>, selector: Option<&str>) -> Result<usize> {
        self.ensure_active()?;
        let mut state = self.state.borrow_mut();
        let mut removed = 0;

        if selector.is_none() {
            let lifecycle = event_type.map(Lifecycle::from_name);
            let before = state.listeners.len();
            state.listeners.retain(|(_, kind, _)| match lifecycle {
                None => false,
                Some(wanted) => wanted != Some(*kind),
            });
            removed += before - state.listeners.len();
        }

        if let Some(delegate) = &state.delegate {
            removed += delegate.off(event_type, selector, None);
        }
        Ok(removed)
    }

    /// Emit an event. Lifecycle names go straight to lifecycle listeners;
    /// anything else is dispatched from the root node and bubbles.
    pub fn emit(&self, event_type: &str, args: Vec<Value>) -> Result<()> {
        self.ensure_active()?;
        if let Some(lifecycle) = Lifecycle::from_name(event_type) {
            self.notify(lifecycle, args);
            return Ok(());
        }

        let node = self.node().ok_or_else(|| Error::NotAttached(self.id()))?;
        events::dispatch(node, &Event::custom(event_type, args));
        Ok(())
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn notify(&self, lifecycle: Lifecycle, args: Vec<Value>) {
        let listeners: Vec<Listener> = self
            .state
            .borrow()
            .listeners
            .iter()
            .filter(|(_, kind, _)| *kind == lifecycle)
            .map(|(_, _, listener)| listener.clone())
            .collect();
        if listeners.is_empty() {
            return;
        }

        let event = Event::custom(lifecycle.name(), args).with_bubbles(false);
        event.set_target(self.node());
        for listener in listeners {
            listener(self, &event);
        }
    }

    fn notify_attached(&self) {
        if let Some(hook) = self.class().attach_hook() {
            hook(self);
        }
        if !self.is_destroyed() {
            self.notify(Lifecycle::Attach, Vec::new());
        }
    }

    /// Queue the next tick. The callback re-queues itself until destroy.
    fn schedule(&self) {
        let component = self.clone();
        let request = frame::request_frame(move || {
            if component.is_destroyed() {
                return Ok(());
            }
            component.tick()?;
            if !component.is_destroyed() {
                component.schedule();
            }
            Ok(())
        });
        self.state.borrow_mut().request = Some(request);
    }

    /// Recompute the dirty flag from data. Props changes set it directly.
    fn refresh_dirty(&self) -> bool {
        let mut state = self.state.borrow_mut();
        let state = &mut *state;
        if !state.dirty {
            state.dirty = state.rendered_data.as_ref() != Some(&state.data);
        }
        state.dirty
    }

    /// Bring the live structure in line with `tree`.
    fn apply_tree(&self, tree: &VNode) -> Result<()> {
        let (node, previous) = {
            let state = self.state.borrow();
            (state.node, state.tree.clone())
        };

        let Some(node) = node else {
            // First render of an unattached instance (a nested component)
            let root = vtree::create(tree)?;
            self.rebind_root(root);
            tracing::debug!(component = %self.id(), node = %root, "created root");
            self.notify_attached();
            return Ok(());
        };

        let previous = match previous {
            Some(previous) => previous,
            None => vtree::snapshot(node)?,
        };
        let patch = vtree::diff(&previous, tree);
        tracing::trace!(
            component = %self.id(),
            kinds = ?patch.kinds(),
            ops = patch.len(),
            "applying patch"
        );

        let root = vtree::apply(node, &patch)?;
        if root != node {
            if self.state.borrow().owns_node {
                dom::release(node);
            }
            self.rebind_root(root);
        }
        Ok(())
    }

    /// A root-level child may replace its own root on a clean tick.
    fn sync_root_widget(&self) {
        let widget_root = match &self.state.borrow().tree {
            Some(VNode::Widget(widget)) => widget.node(),
            _ => None,
        };
        if let Some(root) = widget_root {
            if self.node() != Some(root) {
                self.rebind_root(root);
            }
        }
    }

    /// Switch to a root this instance created.
    fn rebind_root(&self, root: NodeId) {
        let mut state = self.state.borrow_mut();
        state.node = Some(root);
        state.owns_node = true;
        if let Some(delegate) = &state.delegate {
            delegate.root(Some(root));
        }
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Component")
            .field("id", &state.id)
            .field("class", &state.class.name())
            .field("status", &state.status)
            .field("node", &state.node)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Definition;
    use crate::engine::dom::{create_element, reset_document};
    use crate::engine::frame::reset_frames;
    use serde_json::json;

    fn class() -> ComponentClass {
        ComponentClass::new(Definition::new().render(|c| format!("<p>{}</p>", c.data()["n"])))
    }

    #[test]
    fn test_lifecycle_names() {
        for lifecycle in [Lifecycle::Attach, Lifecycle::Render, Lifecycle::Destroy] {
            assert_eq!(Lifecycle::from_name(lifecycle.name()), Some(lifecycle));
        }
        assert_eq!(Lifecycle::from_name("click"), None);
    }

    #[test]
    fn test_data_change_is_noticed_by_tick() {
        reset_document();
        reset_frames();

        let component = class().instantiate(None);
        component.set_data(json!({ "n": 1 }));
        assert!(component.tick().unwrap(), "first tick renders");
        assert!(!component.is_dirty());
        assert!(!component.tick().unwrap());

        component.update_data(|data| data["n"] = json!(2));
        assert!(!component.is_dirty(), "dirtiness is computed by tick");
        assert!(component.tick().unwrap());
        assert_eq!(crate::engine::dom::outer_html(component.node().unwrap()), "<p>2</p>");
        component.destroy();
    }

    #[test]
    fn test_unattached_first_tick_creates_root() {
        reset_document();
        reset_frames();

        let component = class().instantiate(None);
        let attached = Rc::new(std::cell::Cell::new(0));
        let attached_clone = attached.clone();
        component
            .on("attach", None, move |_, _| attached_clone.set(attached_clone.get() + 1))
            .unwrap();

        assert_eq!(component.node(), None);
        component.tick().unwrap();
        assert!(component.node().is_some());
        assert_eq!(attached.get(), 1);
        assert_eq!(frame::pending_frames(), 0, "only attach_to starts a loop");
        component.destroy();
    }

    #[test]
    fn test_destroy_releases_standalone_root() {
        reset_document();
        reset_frames();

        let before = crate::engine::dom::node_count();
        let component = class().instantiate(None);
        component.tick().unwrap();
        let root = component.node().unwrap();
        assert_eq!(crate::engine::dom::node_count(), before + 2, "p and its text");

        component.destroy();
        assert!(!crate::engine::dom::exists(root));
        assert_eq!(crate::engine::dom::node_count(), before);
    }

    #[test]
    fn test_remove_listener_matches_lifecycle_kind() {
        reset_document();
        reset_frames();

        let component = class().instantiate(None);
        let renders = Rc::new(std::cell::Cell::new(0));
        let renders_clone = renders.clone();
        let id = component
            .on("render", None, move |_, _| renders_clone.set(renders_clone.get() + 1))
            .unwrap();

        assert!(!component.remove_listener("destroy", None, id).unwrap(), "wrong kind");
        component.tick().unwrap();
        assert_eq!(renders.get(), 1, "render listener survives");

        assert!(component.remove_listener("render", None, id).unwrap());
        component.update_data(|data| data["n"] = json!(1));
        component.tick().unwrap();
        assert_eq!(renders.get(), 1);
        component.destroy();
    }

    #[test]
    fn test_attach_adopts_existing_content() {
        reset_document();
        reset_frames();

        let target = create_element("p");
        crate::engine::dom::set_text(target, "null").unwrap();
        let component = class().instantiate(None).attach_to(target).unwrap();
        assert_eq!(component.tree(), Some(crate::vtree::parse("<p>null</p>").unwrap()));

        // Renders `<p>null</p>`, identical to what is already there
        assert!(component.tick().unwrap());
        assert_eq!(component.node(), Some(target));
        component.destroy();
    }
}
