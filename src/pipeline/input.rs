//! Input routing - Terminal key presses as delegated `keydown` events.
//!
//! A press becomes a bubbling `keydown` event dispatched at the mounted
//! root. Its detail is `[key, {"ctrl": .., "alt": .., "shift": ..}]`, with
//! key names like `"a"`, `"Enter"`, `"ArrowUp"`.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use serde_json::json;

use crate::engine::NodeId;
use crate::events::{self, Event};

/// What the host should do with a key press.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyAction {
    /// Stop the host.
    Exit,
    /// Dispatched; the number of handler invocations.
    Dispatched(usize),
    /// Not a press, or a key with no name.
    Ignored,
}

/// Name of a key, or `None` for keys that are not routed.
pub fn key_name(code: KeyCode) -> Option<String> {
    let name = match code {
        KeyCode::Char(c) => c.to_string(),
        KeyCode::Enter => "Enter".to_string(),
        KeyCode::Tab => "Tab".to_string(),
        KeyCode::BackTab => "BackTab".to_string(),
        KeyCode::Backspace => "Backspace".to_string(),
        KeyCode::Delete => "Delete".to_string(),
        KeyCode::Esc => "Escape".to_string(),
        KeyCode::Up => "ArrowUp".to_string(),
        KeyCode::Down => "ArrowDown".to_string(),
        KeyCode::Left => "ArrowLeft".to_string(),
        KeyCode::Right => "ArrowRight".to_string(),
        KeyCode::Home => "Home".to_string(),
        KeyCode::End => "End".to_string(),
        KeyCode::PageUp => "PageUp".to_string(),
        KeyCode::PageDown => "PageDown".to_string(),
        KeyCode::Insert => "Insert".to_string(),
        KeyCode::F(n) => format!("F{}", n),
        _ => return None,
    };
    Some(name)
}

/// Build the `keydown` event for a press.
pub fn keydown_event(key: &str, modifiers: KeyModifiers) -> Event {
    Event::custom(
        "keydown",
        vec![
            json!(key),
            json!({
                "ctrl": modifiers.contains(KeyModifiers::CONTROL),
                "alt": modifiers.contains(KeyModifiers::ALT),
                "shift": modifiers.contains(KeyModifiers::SHIFT),
            }),
        ],
    )
}

/// Route one key event at `root`.
pub fn route_key(root: NodeId, event: KeyEvent, exit_on_escape: bool) -> KeyAction {
    if event.kind != KeyEventKind::Press {
        return KeyAction::Ignored;
    }
    if event.code == KeyCode::Char('c') && event.modifiers.contains(KeyModifiers::CONTROL) {
        return KeyAction::Exit;
    }
    if event.code == KeyCode::Esc && exit_on_escape {
        return KeyAction::Exit;
    }

    let Some(key) = key_name(event.code) else {
        return KeyAction::Ignored;
    };
    let invoked = events::dispatch(root, &keydown_event(&key, event.modifiers));
    KeyAction::Dispatched(invoked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::dom::{create_element, reset_document};
    use crate::events::Delegate;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn press(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn test_key_names() {
        assert_eq!(key_name(KeyCode::Char('x')).as_deref(), Some("x"));
        assert_eq!(key_name(KeyCode::Up).as_deref(), Some("ArrowUp"));
        assert_eq!(key_name(KeyCode::F(5)).as_deref(), Some("F5"));
        assert_eq!(key_name(KeyCode::Null), None);
    }

    #[test]
    fn test_exit_keys() {
        reset_document();
        let root = create_element("div");

        assert_eq!(
            route_key(root, press(KeyCode::Char('c'), KeyModifiers::CONTROL), false),
            KeyAction::Exit
        );
        assert_eq!(route_key(root, press(KeyCode::Esc, KeyModifiers::NONE), true), KeyAction::Exit);
        assert_eq!(
            route_key(root, press(KeyCode::Esc, KeyModifiers::NONE), false),
            KeyAction::Dispatched(0),
            "escape is an ordinary key when not bound to exit"
        );
    }

    #[test]
    fn test_keydown_reaches_root_listener() {
        reset_document();
        let root = create_element("div");
        let delegate = Delegate::new();
        delegate.root(Some(root));

        let keys = Rc::new(RefCell::new(Vec::new()));
        let keys_clone = keys.clone();
        delegate
            .on(
                "keydown",
                None,
                Rc::new(move |event: &Event| {
                    let key = event.detail()[0].as_str().unwrap_or_default().to_string();
                    let shift = event.detail()[1]["shift"].as_bool().unwrap_or(false);
                    keys_clone.borrow_mut().push((key, shift));
                }),
            )
            .unwrap();

        let action = route_key(root, press(KeyCode::Char('A'), KeyModifiers::SHIFT), true);
        assert_eq!(action, KeyAction::Dispatched(1));
        assert_eq!(*keys.borrow(), vec![("A".to_string(), true)]);
    }
}
