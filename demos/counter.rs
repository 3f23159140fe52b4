//! Counter demo.
//!
//! Run with: `cargo run --example counter`
//!
//! `+` / `-` change the count, `r` resets, Escape or Ctrl+C quits.

use hyperd::pipeline::{self, RenderMode};
use hyperd::{ComponentClass, Definition, dom};
use serde_json::json;

fn main() -> hyperd::Result<()> {
    let badge = ComponentClass::new(
        Definition::new()
            .name("badge")
            .render(|c| format!("<span>[{}]</span>", c.props()["label"].as_str().unwrap_or_default())),
    );

    let counter = ComponentClass::new(
        Definition::new()
            .name("counter")
            .component("badge", &badge)
            .setup(|c| c.set_data(json!({ "count": 0 })))
            .render(|c| {
                let count = c.data()["count"].as_i64().unwrap_or_default();
                let label = if count < 0 { "negative" } else { "non-negative" };
                format!(
                    "<pre>Count: {count} <badge label=\"{label}\"/>\n\n+ / - to change, r to reset, Esc to quit</pre>"
                )
            }),
    );

    let target = dom::create_element("pre");
    let app = counter.instantiate(None).attach_to(target)?;
    app.on("keydown", None, |c, event| {
        let delta = match event.detail().first().and_then(|key| key.as_str()) {
            Some("+") => 1,
            Some("-") => -1,
            Some("r") => {
                c.set_data(json!({ "count": 0 }));
                return;
            }
            _ => return,
        };
        c.update_data(|data| {
            data["count"] = json!(data["count"].as_i64().unwrap_or_default() + delta);
        });
    })?;

    pipeline::set_render_mode(RenderMode::Inline);
    let handle = pipeline::mount(&app)?;
    let result = pipeline::run(&handle);
    handle.unmount();
    app.destroy();
    result
}
