//! # hyperd
//!
//! Component reconciliation runtime.
//!
//! Components render markup from their props and data. Every frame, a dirty
//! component re-renders; the markup is parsed into a snapshot, nested
//! component tags are swapped for embedded children, and only the difference
//! to the previous snapshot is applied to the live structure. Events are
//! delegated per component with selectors.
//!
//! ## Architecture
//!
//! ```text
//! frame → Component::tick → render → vtree::parse → inflate → vtree::diff → vtree::apply
//!                                                                  │
//!                                         Widget init/update/destroy (child ticks)
//! ```
//!
//! ## Modules
//!
//! - [`component`] - Classes, instances, widgets
//! - [`vtree`] - Snapshots, parser, diff and patch
//! - [`engine`] - Live node arena, selectors, frame scheduler
//! - [`events`] - Event delegation and dispatch
//! - [`pipeline`] - Terminal host and its configuration
//!
//! ## Example
//!
//! ```ignore
//! use hyperd::{dom, frame};
//!
//! let target = dom::create_element("div");
//! let hello = hyperd::create(target, |_| "<div>hello</div>".into())?;
//!
//! frame::run_frame()?;
//! assert_eq!(dom::inner_html(hello.node().unwrap()), "hello");
//! ```

pub mod component;
pub mod engine;
pub mod error;
pub mod events;
pub mod pipeline;
pub mod types;
pub mod vtree;

pub use component::{Component, ComponentClass, Definition, Lifecycle, Status, Widget};
pub use engine::{NodeId, dom, frame};
pub use error::{Error, Result};
pub use events::Event;
pub use types::{ComponentId, ListenerId, Value};
pub use vtree::{ParseError, VNode};

/// Create an anonymous component from a render operation and attach it to
/// `target`.
pub fn create(target: NodeId, render: impl Fn(&Component) -> String + 'static) -> Result<Component> {
    ComponentClass::new(Definition::new().name("anonymous").render(render))
        .instantiate(None)
        .attach_to(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_attaches_and_renders() {
        dom::reset_document();
        frame::reset_frames();

        let target = dom::create_element("div");
        let component = create(target, |_| "<div>hi</div>".into()).unwrap();
        assert_eq!(component.node(), Some(target));
        assert_eq!(component.class().name(), "anonymous");

        frame::run_frame().unwrap();
        assert_eq!(dom::inner_html(target), "hi");
        assert_eq!(component.render_count(), 1);

        component.destroy();
        assert_eq!(frame::pending_frames(), 0);
    }
}
