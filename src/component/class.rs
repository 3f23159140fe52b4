//! Component classes and the definitions that build them.
//!
//! A class bundles a render operation, lifecycle hooks and a registry of
//! nested component classes. Classes are cheap to clone and compared by
//! identity: two widgets are "the same kind" only when they share a class.
//!
//! # Example
//!
//! ```ignore
//! use hyperd::component::{ComponentClass, Definition};
//!
//! let greeting = ComponentClass::new(
//!     Definition::new()
//!         .name("greeting")
//!         .render(|c| format!("<span>{}</span>", c.props()["greeting"].as_str().unwrap_or(""))),
//! );
//!
//! let page = ComponentClass::new(
//!     Definition::new()
//!         .render(|_| r#"<div><main greeting="hi"/></div>"#.into())
//!         .component("main", &greeting),
//! );
//! ```

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::Component;
use crate::types::Value;

/// Produces markup from a component's current props and data.
pub type RenderFn = Rc<dyn Fn(&Component) -> String>;

/// Lifecycle hook.
pub type Hook = Rc<dyn Fn(&Component)>;

/// Registry of nested component classes keyed by tag name.
pub type Registry = IndexMap<String, ComponentClass>;

// =============================================================================
// Definition
// =============================================================================

/// Builder for [`ComponentClass`]. Anything left unset is inherited when
/// extending.
#[derive(Clone, Default)]
pub struct Definition {
    name: Option<String>,
    render: Option<RenderFn>,
    setup: Option<Hook>,
    on_attach: Option<Hook>,
    on_render: Option<Hook>,
    on_destroy: Option<Hook>,
    components: Registry,
}

impl Definition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn render(mut self, render: impl Fn(&Component) -> String + 'static) -> Self {
        self.render = Some(Rc::new(render));
        self
    }

    /// Runs once per instance at construction, after any inherited setup.
    pub fn setup(mut self, hook: impl Fn(&Component) + 'static) -> Self {
        self.setup = Some(Rc::new(hook));
        self
    }

    pub fn on_attach(mut self, hook: impl Fn(&Component) + 'static) -> Self {
        self.on_attach = Some(Rc::new(hook));
        self
    }

    pub fn on_render(mut self, hook: impl Fn(&Component) + 'static) -> Self {
        self.on_render = Some(Rc::new(hook));
        self
    }

    pub fn on_destroy(mut self, hook: impl Fn(&Component) + 'static) -> Self {
        self.on_destroy = Some(Rc::new(hook));
        self
    }

    /// Render `tag` elements as instances of `class`.
    pub fn component(mut self, tag: &str, class: &ComponentClass) -> Self {
        self.components.insert(tag.to_string(), class.clone());
        self
    }
}

// =============================================================================
// ComponentClass
// =============================================================================

struct ClassInner {
    name: String,
    render: Option<RenderFn>,
    setup: Vec<Hook>,
    on_attach: Option<Hook>,
    on_render: Option<Hook>,
    on_destroy: Option<Hook>,
    components: Registry,
}

/// A component class. Clones share identity.
#[derive(Clone)]
pub struct ComponentClass {
    inner: Rc<ClassInner>,
}

impl ComponentClass {
    /// The root class: no render operation, no hooks, no nested components.
    pub fn base() -> Self {
        Self {
            inner: Rc::new(ClassInner {
                name: "Component".to_string(),
                render: None,
                setup: Vec::new(),
                on_attach: None,
                on_render: None,
                on_destroy: None,
                components: Registry::new(),
            }),
        }
    }

    /// A class derived from the base class.
    pub fn new(definition: Definition) -> Self {
        Self::base().extend(definition)
    }

    /// Derive a subclass. The definition's entries override this class's;
    /// setup hooks chain (this class first) and component registries merge.
    pub fn extend(&self, definition: Definition) -> Self {
        let parent = &self.inner;

        let mut setup = parent.setup.clone();
        setup.extend(definition.setup);

        let mut components = parent.components.clone();
        components.extend(definition.components);

        Self {
            inner: Rc::new(ClassInner {
                name: definition.name.unwrap_or_else(|| parent.name.clone()),
                render: definition.render.or_else(|| parent.render.clone()),
                setup,
                on_attach: definition.on_attach.or_else(|| parent.on_attach.clone()),
                on_render: definition.on_render.or_else(|| parent.on_render.clone()),
                on_destroy: definition.on_destroy.or_else(|| parent.on_destroy.clone()),
                components,
            }),
        }
    }

    /// Construct an instance. `None` or `null` props become `{}`.
    pub fn instantiate(&self, props: Option<Value>) -> Component {
        Component::new(self, props)
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Nested component classes by tag.
    pub fn components(&self) -> &Registry {
        &self.inner.components
    }

    /// Find the nested class for `tag`, ignoring ASCII case.
    pub fn lookup(&self, tag: &str) -> Option<&ComponentClass> {
        lookup(&self.inner.components, tag)
    }

    pub fn has_render(&self) -> bool {
        self.inner.render.is_some()
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &ComponentClass) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn render_fn(&self) -> Option<RenderFn> {
        self.inner.render.clone()
    }

    pub(crate) fn setup_hooks(&self) -> Vec<Hook> {
        self.inner.setup.clone()
    }

    pub(crate) fn attach_hook(&self) -> Option<Hook> {
        self.inner.on_attach.clone()
    }

    pub(crate) fn render_hook(&self) -> Option<Hook> {
        self.inner.on_render.clone()
    }

    pub(crate) fn destroy_hook(&self) -> Option<Hook> {
        self.inner.on_destroy.clone()
    }
}

impl Default for ComponentClass {
    fn default() -> Self {
        Self::base()
    }
}

impl fmt::Debug for ComponentClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentClass")
            .field("name", &self.inner.name)
            .field("components", &self.inner.components.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Case-insensitive registry lookup.
pub fn lookup<'a>(registry: &'a Registry, tag: &str) -> Option<&'a ComponentClass> {
    registry
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(tag))
        .map(|(_, class)| class)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_extend_overrides_and_inherits() {
        let parent = ComponentClass::new(
            Definition::new()
                .name("parent")
                .render(|_| "<p>parent</p>".into()),
        );
        let child = parent.extend(Definition::new().name("child"));
        let renamed = parent.extend(Definition::new().render(|_| "<p>child</p>".into()));

        assert_eq!(child.name(), "child");
        assert!(child.has_render(), "render is inherited");
        assert_eq!(renamed.name(), "parent", "name is inherited");
        assert!(!parent.ptr_eq(&child));
        assert!(child.ptr_eq(&child.clone()));
    }

    #[test]
    fn test_setup_hooks_chain_parent_first() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let parent_order = order.clone();
        let child_order = order.clone();

        let parent = ComponentClass::new(
            Definition::new().setup(move |_| parent_order.borrow_mut().push("parent")),
        );
        let child = parent.extend(Definition::new().setup(move |_| child_order.borrow_mut().push("child")));

        let hooks = child.setup_hooks();
        assert_eq!(hooks.len(), 2);
        let instance = child.instantiate(None);
        assert_eq!(*order.borrow(), vec!["parent", "child"]);
        instance.destroy();
    }

    #[test]
    fn test_registry_merges_and_lookup_ignores_case() {
        let a = ComponentClass::new(Definition::new().name("a"));
        let b = ComponentClass::new(Definition::new().name("b"));

        let parent = ComponentClass::new(Definition::new().component("Item", &a));
        let child = parent.extend(Definition::new().component("row", &b));

        assert_eq!(child.components().len(), 2);
        assert!(child.lookup("item").is_some_and(|class| class.ptr_eq(&a)));
        assert!(child.lookup("ROW").is_some_and(|class| class.ptr_eq(&b)));
        assert!(child.lookup("cell").is_none());
        assert!(parent.lookup("row").is_none(), "parents are untouched");
    }
}
