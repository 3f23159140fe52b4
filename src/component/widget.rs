//! Widgets - Placeholders for nested components inside a snapshot.
//!
//! A widget is created by inflation for every registered tag. It carries
//! the class and the string properties parsed from the tag, and owns the
//! child component once initialized. Across re-renders, ownership moves
//! from the previous snapshot's widget to the next one at the same place.
//!
//! ```text
//! init     → instantiate with props, tick once, hand back its root node
//! update   → take previous's component, set_props, tick
//! adopt    → take previous's component, tick it with its props untouched
//! destroy  → destroy the owned component (once)
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use super::{Component, ComponentClass};
use crate::engine::NodeId;
use crate::error::{Error, Result};
use crate::types::{Map, Value};
use crate::vtree::Properties;

struct WidgetInner {
    class: ComponentClass,
    properties: Properties,
    component: RefCell<Option<Component>>,
    rendered: Cell<bool>,
}

/// An embedded component placeholder. Clones share state.
#[derive(Clone)]
pub struct Widget {
    inner: Rc<WidgetInner>,
}

impl Widget {
    pub fn new(class: ComponentClass, properties: Properties) -> Self {
        Self {
            inner: Rc::new(WidgetInner {
                class,
                properties,
                component: RefCell::new(None),
                rendered: Cell::new(false),
            }),
        }
    }

    pub fn class(&self) -> &ComponentClass {
        &self.inner.class
    }

    /// Properties as parsed from the tag.
    pub fn properties(&self) -> &Properties {
        &self.inner.properties
    }

    /// Properties as a props object of strings.
    pub fn props(&self) -> Value {
        let map: Map<String, Value> = self
            .inner
            .properties
            .iter()
            .map(|(name, value)| (name.clone(), Value::String(value.clone())))
            .collect();
        Value::Object(map)
    }

    /// The owned child component, if any.
    pub fn component(&self) -> Option<Component> {
        self.inner.component.borrow().clone()
    }

    /// The child's current root node.
    pub fn node(&self) -> Option<NodeId> {
        self.component().and_then(|component| component.node())
    }

    /// Whether the child rendered on its last tick through this widget.
    pub fn rendered(&self) -> bool {
        self.inner.rendered.get()
    }

    pub fn same_class(&self, other: &Widget) -> bool {
        self.inner.class.ptr_eq(&other.inner.class)
    }

    /// Instantiate and render the child, returning its root node.
    pub fn init(&self) -> Result<NodeId> {
        let component = self.inner.class.instantiate(Some(self.props()));
        *self.inner.component.borrow_mut() = Some(component.clone());

        tracing::trace!(
            class = self.inner.class.name(),
            component = %component.id(),
            "widget init"
        );

        let rendered = component.tick()?;
        self.inner.rendered.set(rendered);
        component.node().ok_or(Error::NotAttached(component.id()))
    }

    /// Take over `previous`'s child, give it this widget's props and tick it.
    pub fn update(&self, previous: &Widget) -> Result<()> {
        let component = previous
            .take()
            .ok_or_else(|| Error::WidgetUninitialized(self.class().name().to_string()))?;
        *self.inner.component.borrow_mut() = Some(component.clone());

        component.set_props(Some(self.props()))?;
        let rendered = component.tick()?;
        self.inner.rendered.set(rendered);
        Ok(())
    }

    /// Take over `previous`'s child with its props as they are and tick it,
    /// so its own data changes still render while the parent re-renders.
    pub fn adopt(&self, previous: &Widget) -> Result<()> {
        let Some(component) = previous.take() else {
            return Ok(());
        };
        *self.inner.component.borrow_mut() = Some(component.clone());

        if component.is_destroyed() {
            self.inner.rendered.set(false);
            return Ok(());
        }
        let rendered = component.tick()?;
        self.inner.rendered.set(rendered);
        Ok(())
    }

    /// Destroy the owned child. Later calls do nothing.
    pub fn destroy(&self) {
        if let Some(component) = self.take() {
            component.destroy();
        }
    }

    fn take(&self) -> Option<Component> {
        self.inner.component.borrow_mut().take()
    }
}

impl PartialEq for Widget {
    /// Same class and equal properties. Ownership is not compared.
    fn eq(&self, other: &Self) -> bool {
        self.same_class(other) && self.inner.properties == other.inner.properties
    }
}

impl fmt::Debug for Widget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Widget")
            .field("class", &self.inner.class.name())
            .field("properties", &self.inner.properties)
            .field("component", &self.component().map(|c| c.id()))
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
    use crate::engine::dom::reset_document;
    use crate::engine::frame::reset_frames;
    use serde_json::json;

    fn label_widget() -> Widget {
        let class = ComponentClass::new(
            Definition::new()
                .name("label")
                .render(|c| format!("<i>{}</i>", c.data()["text"])),
        );
        Widget::new(class, Properties::new())
    }

    fn next_for(widget: &Widget) -> Widget {
        Widget::new(widget.class().clone(), widget.properties().clone())
    }

    #[test]
    fn test_init_records_render() {
        reset_document();
        reset_frames();

        let widget = label_widget();
        assert!(!widget.rendered());
        let node = widget.init().unwrap();
        assert!(widget.rendered());
        assert_eq!(widget.node(), Some(node));
        widget.destroy();
    }

    #[test]
    fn test_adopt_ticks_child_and_records_result() {
        reset_document();
        reset_frames();

        let first = label_widget();
        first.init().unwrap();
        let child = first.component().unwrap();

        let second = next_for(&first);
        second.adopt(&first).unwrap();
        assert!(first.component().is_none(), "ownership moved");
        assert!(second.component().unwrap().ptr_eq(&child));
        assert!(!second.rendered(), "clean child does not render");

        child.set_data(json!({ "text": "hi" }));
        let third = next_for(&second);
        third.adopt(&second).unwrap();
        assert!(third.rendered(), "own data change renders");
        assert_eq!(child.render_count(), 2);

        third.destroy();
        third.destroy();
        assert!(child.is_destroyed());
    }
}
