//! Inflation: swap registered tags in a parsed snapshot for widgets.

use super::class::{Registry, lookup};
use super::Widget;
use crate::vtree::{VElement, VNode};

/// Replace every element whose tag is in `registry` with a widget.
///
/// Matching ignores ASCII case. The element's properties become the
/// widget's properties; its children are dropped. New widgets are pushed
/// onto `widgets` in document order.
pub fn inflate(tree: VNode, registry: &Registry, widgets: &mut Vec<Widget>) -> VNode {
    if registry.is_empty() {
        return tree;
    }

    match tree {
        VNode::Element(VElement {
            tag,
            properties,
            children,
        }) => {
            if let Some(class) = lookup(registry, &tag) {
                let widget = Widget::new(class.clone(), properties);
                widgets.push(widget.clone());
                return VNode::Widget(widget);
            }

            let children = children
                .into_iter()
                .map(|child| inflate(child, registry, widgets))
                .collect();
            VNode::Element(VElement {
                tag,
                properties,
                children,
            })
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{ComponentClass, Definition};
    use crate::vtree::parse;

    #[test]
    fn test_inflate_replaces_registered_tags() {
        let item = ComponentClass::new(Definition::new().name("item"));
        let mut registry = Registry::new();
        registry.insert("Item".to_string(), item.clone());

        let tree = parse(r#"<ul><item label="a"/><li>plain</li><ITEM label="b"><b>dropped</b></ITEM></ul>"#).unwrap();
        let mut widgets = Vec::new();
        let tree = inflate(tree, &registry, &mut widgets);

        assert_eq!(widgets.len(), 2);
        assert!(widgets[0].class().ptr_eq(&item));
        assert_eq!(widgets[0].properties().get("label").map(String::as_str), Some("a"));
        assert_eq!(widgets[1].properties().get("label").map(String::as_str), Some("b"));

        let children = tree.children();
        assert!(matches!(children[0], VNode::Widget(_)));
        assert_eq!(children[1].tag(), Some("li"));
        assert!(matches!(children[2], VNode::Widget(_)));
    }

    #[test]
    fn test_empty_registry_is_identity() {
        let tree = parse("<main>x</main>").unwrap();
        let mut widgets = Vec::new();
        assert_eq!(inflate(tree.clone(), &Registry::new(), &mut widgets), tree);
        assert!(widgets.is_empty());
    }
}
