//! Selectors used by delegation and queries.
//!
//! Supported syntax: type (`button`), universal (`*`), class (`.primary`),
//! id (`#save`), attribute presence and equality (`[disabled]`,
//! `[type=submit]`, `[type="submit"]`), compounds of those
//! (`button.primary[type=submit]`), descendant (`ul li`) and child (`ul > li`)
//! combinators, and comma-separated groups.

use super::dom::{self, NodeId};
use crate::error::{Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<(String, Option<String>)>,
}

impl Compound {
    fn matches(&self, node: NodeId) -> bool {
        dom::with_element(node, |tag, attributes| {
            if let Some(expected) = &self.tag {
                if !expected.eq_ignore_ascii_case(tag) {
                    return false;
                }
            }
            if let Some(id) = &self.id {
                if attributes.get("id") != Some(id) {
                    return false;
                }
            }
            if !self.classes.is_empty() {
                let class_list = attributes.get("class").map(String::as_str).unwrap_or("");
                let has_all = self
                    .classes
                    .iter()
                    .all(|class| class_list.split_whitespace().any(|c| c == class));
                if !has_all {
                    return false;
                }
            }
            self.attributes.iter().all(|(name, value)| match value {
                Some(value) => attributes.get(name) == Some(value),
                None => attributes.contains_key(name),
            })
        })
        .unwrap_or(false)
    }
}

/// One comma-separated alternative: compounds joined by combinators.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Complex {
    // The combinator of the first part is unused
    parts: Vec<(Combinator, Compound)>,
}

impl Complex {
    fn matches(&self, node: NodeId) -> bool {
        self.matches_from(self.parts.len() - 1, node)
    }

    fn matches_from(&self, index: usize, node: NodeId) -> bool {
        let (combinator, compound) = &self.parts[index];
        if !compound.matches(node) {
            return false;
        }
        if index == 0 {
            return true;
        }

        match combinator {
            Combinator::Child => dom::parent(node)
                .map(|parent| self.matches_from(index - 1, parent))
                .unwrap_or(false),
            Combinator::Descendant => {
                let mut ancestor = dom::parent(node);
                while let Some(current) = ancestor {
                    if self.matches_from(index - 1, current) {
                        return true;
                    }
                    ancestor = dom::parent(current);
                }
                false
            }
        }
    }
}

/// A parsed selector.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selector {
    source: String,
    groups: Vec<Complex>,
}

impl Selector {
    /// Parse a selector string.
    pub fn parse(source: &str) -> Result<Self> {
        let groups = source
            .split(',')
            .map(|group| parse_complex(group.trim()))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| Error::Selector(source.to_string()))?;

        Ok(Self {
            source: source.trim().to_string(),
            groups,
        })
    }

    /// The selector text as given (trimmed).
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Check whether `node` matches any alternative.
    pub fn matches(&self, node: NodeId) -> bool {
        self.groups.iter().any(|group| group.matches(node))
    }
}

// =============================================================================
// Parsing
// =============================================================================

fn parse_complex(input: &str) -> Option<Complex> {
    let chars: Vec<char> = input.chars().collect();
    let mut pos = 0;
    let mut parts = Vec::new();
    let mut combinator = Combinator::Descendant;

    loop {
        while pos < chars.len() && chars[pos].is_whitespace() {
            pos += 1;
        }
        if pos >= chars.len() {
            break;
        }
        if chars[pos] == '>' {
            if parts.is_empty() || combinator == Combinator::Child {
                return None;
            }
            combinator = Combinator::Child;
            pos += 1;
            continue;
        }

        let compound = parse_compound(&chars, &mut pos)?;
        parts.push((combinator, compound));
        combinator = Combinator::Descendant;
    }

    // Empty group or dangling `>`
    if parts.is_empty() || combinator == Combinator::Child {
        return None;
    }
    Some(Complex { parts })
}

fn is_ident_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '-' || ch == '_'
}

fn parse_ident(chars: &[char], pos: &mut usize) -> Option<String> {
    let start = *pos;
    while *pos < chars.len() && is_ident_char(chars[*pos]) {
        *pos += 1;
    }
    (*pos > start).then(|| chars[start..*pos].iter().collect())
}

fn parse_compound(chars: &[char], pos: &mut usize) -> Option<Compound> {
    let start = *pos;
    let mut compound = Compound::default();

    if chars.get(*pos) == Some(&'*') {
        *pos += 1;
    } else if chars.get(*pos).copied().is_some_and(is_ident_char) {
        compound.tag = Some(parse_ident(chars, pos)?.to_ascii_lowercase());
    }

    loop {
        match chars.get(*pos) {
            Some('.') => {
                *pos += 1;
                compound.classes.push(parse_ident(chars, pos)?);
            }
            Some('#') => {
                *pos += 1;
                compound.id = Some(parse_ident(chars, pos)?);
            }
            Some('[') => {
                *pos += 1;
                let name = parse_ident(chars, pos)?.to_ascii_lowercase();
                let value = match chars.get(*pos) {
                    Some(']') => None,
                    Some('=') => {
                        *pos += 1;
                        Some(parse_attribute_value(chars, pos)?)
                    }
                    _ => return None,
                };
                if chars.get(*pos) != Some(&']') {
                    return None;
                }
                *pos += 1;
                compound.attributes.push((name, value));
            }
            _ => break,
        }
    }

    (*pos > start).then_some(compound)
}

fn parse_attribute_value(chars: &[char], pos: &mut usize) -> Option<String> {
    match chars.get(*pos) {
        Some(&quote) if quote == '"' || quote == '\'' => {
            *pos += 1;
            let start = *pos;
            while *pos < chars.len() && chars[*pos] != quote {
                *pos += 1;
            }
            if *pos >= chars.len() {
                return None;
            }
            let value = chars[start..*pos].iter().collect();
            *pos += 1;
            Some(value)
        }
        _ => parse_ident(chars, pos),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::dom::{append_child, create_element, reset_document, set_attribute};

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in ["", "  ", "a,", ".", "#", "[x", "[x=\"y]", "> a", "a >", "a > > b"] {
            assert!(Selector::parse(bad).is_err(), "`{}` should not parse", bad);
        }
        assert!(Selector::parse("button.primary[type=submit], #save").is_ok());
    }

    #[test]
    fn test_compound_matching() {
        reset_document();

        let button = create_element("button");
        set_attribute(button, "class", "btn primary").unwrap();
        set_attribute(button, "type", "submit").unwrap();
        set_attribute(button, "id", "save").unwrap();

        let matches = |source: &str| Selector::parse(source).unwrap().matches(button);
        assert!(matches("button"));
        assert!(matches("BUTTON"), "type selectors are case-insensitive");
        assert!(matches("*"));
        assert!(matches(".primary"));
        assert!(matches("button.btn.primary"));
        assert!(matches("#save"));
        assert!(matches("[type]"));
        assert!(matches("[type=submit]"));
        assert!(matches("[type='submit']"));
        assert!(!matches("a"));
        assert!(!matches(".secondary"));
        assert!(!matches("[type=reset]"));
        assert!(matches("a, .primary"), "any group may match");
    }

    #[test]
    fn test_combinators() {
        reset_document();

        let list = create_element("ul");
        let item = create_element("li");
        let link = create_element("a");
        append_child(list, item).unwrap();
        append_child(item, link).unwrap();

        assert!(Selector::parse("ul a").unwrap().matches(link));
        assert!(Selector::parse("li > a").unwrap().matches(link));
        assert!(!Selector::parse("ul > a").unwrap().matches(link));
        assert!(!Selector::parse("ol a").unwrap().matches(link));
    }
}
