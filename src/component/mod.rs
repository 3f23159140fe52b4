//! Component - Classes, instances and embedded widgets.
//!
//! # API
//!
//! - `ComponentClass::new(Definition)` - Define a class
//! - `class.extend(Definition)` - Derive a subclass
//! - `class.instantiate(props)` - Construct an instance
//! - `component.attach_to(node)` - Take over a node and start the loop
//! - `component.tick()` - One reconciliation step
//! - `component.destroy()` - Tear down
//!
//! # Example
//!
//! ```ignore
//! use hyperd::component::{ComponentClass, Definition};
//! use serde_json::json;
//!
//! let counter = ComponentClass::new(
//!     Definition::new()
//!         .setup(|c| c.set_data(json!({ "count": 0 })))
//!         .render(|c| format!("<button>{}</button>", c.data()["count"])),
//! );
//!
//! let instance = counter.instantiate(None).attach_to(root)?;
//! instance.on("click", Some("button"), |c, _| {
//!     c.update_data(|data| data["count"] = json!(data["count"].as_i64().unwrap_or(0) + 1));
//! })?;
//! ```

mod class;
mod inflate;
mod instance;
mod widget;

pub use class::{ComponentClass, Definition, Hook, Registry, RenderFn, lookup};
pub use inflate::inflate;
pub use instance::{Component, Lifecycle, Listener, Status, WeakComponent};
pub use widget::Widget;
