//! Markup Parser - Render output to a single-rooted snapshot.
//!
//! Accepts the HTML subset render operations produce: elements with quoted,
//! bare or boolean attributes, self-closing tags (`<main greeting="hi"/>`),
//! void elements, text with character references, comments and doctypes
//! (both skipped). Tag names are lowercased, attribute names keep their case.

use thiserror::Error;

use super::{Properties, VNode};
use crate::engine::dom::is_void_element;

/// Why markup could not be turned into a snapshot. Offsets are byte
/// positions into the trimmed markup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("markup is empty")]
    Empty,

    #[error("markup has {0} root nodes, expected exactly one")]
    MultipleRoots(usize),

    #[error("unexpected end of markup at byte {0}")]
    UnexpectedEof(usize),

    #[error("expected a tag name at byte {0}")]
    ExpectedTagName(usize),

    #[error("malformed attribute at byte {0}")]
    MalformedAttribute(usize),

    #[error("closing tag </{found}> at byte {offset} does not match <{expected}>")]
    MismatchedClose {
        expected: String,
        found: String,
        offset: usize,
    },

    #[error("closing tag </{tag}> at byte {offset} has no open element")]
    UnexpectedClose { tag: String, offset: usize },

    #[error("element <{tag}> opened at byte {offset} is never closed")]
    Unclosed { tag: String, offset: usize },
}

/// Parse markup into a snapshot. Surrounding whitespace is trimmed first.
pub fn parse(markup: &str) -> Result<VNode, ParseError> {
    let source = markup.trim();
    if source.is_empty() {
        return Err(ParseError::Empty);
    }

    let mut parser = Parser { source, pos: 0 };
    let mut roots = parser.parse_nodes(None)?;
    match roots.len() {
        1 => Ok(roots.remove(0)),
        0 => Err(ParseError::Empty),
        n => Err(ParseError::MultipleRoots(n)),
    }
}

// =============================================================================
// Parser
// =============================================================================

struct Parser<'a> {
    source: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.source[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    /// Skip past `terminator`, or to the end when it never appears.
    fn skip_past(&mut self, terminator: &str) {
        match self.rest().find(terminator) {
            Some(index) => self.pos += index + terminator.len(),
            None => self.pos = self.source.len(),
        }
    }

    /// Whether a `<` at the cursor starts markup rather than literal text.
    fn at_markup(&self) -> bool {
        let mut chars = self.rest().chars();
        chars.next() == Some('<')
            && chars
                .next()
                .is_some_and(|ch| ch.is_ascii_alphabetic() || ch == '/' || ch == '!')
    }

    /// Parse sibling nodes until the parent's closing tag (or the end for the
    /// top level).
    fn parse_nodes(&mut self, parent: Option<(&str, usize)>) -> Result<Vec<VNode>, ParseError> {
        let mut nodes = Vec::new();

        loop {
            if self.at_end() {
                return match parent {
                    Some((tag, offset)) => Err(ParseError::Unclosed {
                        tag: tag.to_string(),
                        offset,
                    }),
                    None => Ok(nodes),
                };
            }

            if self.rest().starts_with("<!--") {
                self.skip_past("-->");
                continue;
            }
            if self.rest().starts_with("<!") {
                self.skip_past(">");
                continue;
            }

            if self.rest().starts_with("</") {
                let offset = self.pos;
                self.pos += 2;
                let found = self.parse_name().ok_or(ParseError::ExpectedTagName(self.pos))?;
                let found = found.to_ascii_lowercase();
                self.skip_whitespace();
                if self.bump() != Some('>') {
                    return Err(ParseError::UnexpectedEof(self.pos));
                }
                return match parent {
                    Some((expected, _)) if expected == found => Ok(nodes),
                    Some((expected, _)) => Err(ParseError::MismatchedClose {
                        expected: expected.to_string(),
                        found,
                        offset,
                    }),
                    None => Err(ParseError::UnexpectedClose { tag: found, offset }),
                };
            }

            if self.at_markup() {
                nodes.push(self.parse_element()?);
                continue;
            }

            let text = self.parse_text();
            nodes.push(VNode::Text(decode_entities(text)));
        }
    }

    fn parse_text(&mut self) -> &'a str {
        let start = self.pos;
        // Always consume at least one char so a lone `<` becomes text
        self.bump();
        while !self.at_end() && !self.at_markup() {
            self.bump();
        }
        &self.source[start..self.pos]
    }

    fn parse_name(&mut self) -> Option<&'a str> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|ch| ch.is_alphanumeric() || matches!(ch, '-' | '_' | ':' | '.'))
        {
            self.bump();
        }
        (self.pos > start).then(|| &self.source[start..self.pos])
    }

    fn parse_element(&mut self) -> Result<VNode, ParseError> {
        let offset = self.pos;
        self.bump(); // <
        let tag = self
            .parse_name()
            .ok_or(ParseError::ExpectedTagName(self.pos))?
            .to_ascii_lowercase();

        let mut properties = Properties::new();
        let self_closing = loop {
            self.skip_whitespace();
            if self.rest().starts_with("/>") {
                self.pos += 2;
                break true;
            }
            match self.peek() {
                None => return Err(ParseError::UnexpectedEof(self.pos)),
                Some('>') => {
                    self.bump();
                    break false;
                }
                Some(_) => {
                    let (name, value) = self.parse_attribute()?;
                    properties.insert(name, value);
                }
            }
        };

        if self_closing || is_void_element(&tag) {
            return Ok(VNode::element(&tag, properties, Vec::new()));
        }

        let children = self.parse_nodes(Some((tag.as_str(), offset)))?;
        Ok(VNode::element(&tag, properties, children))
    }

    fn parse_attribute(&mut self) -> Result<(String, String), ParseError> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|ch| !ch.is_whitespace() && !matches!(ch, '=' | '>' | '/' | '"' | '\''))
        {
            self.bump();
        }
        if self.pos == start {
            return Err(ParseError::MalformedAttribute(start));
        }
        let name = self.source[start..self.pos].to_string();

        self.skip_whitespace();
        if self.peek() != Some('=') {
            // Boolean attribute
            return Ok((name, String::new()));
        }
        self.bump();
        self.skip_whitespace();

        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.bump();
                let value_start = self.pos;
                let Some(len) = self.rest().find(quote) else {
                    return Err(ParseError::UnexpectedEof(self.source.len()));
                };
                self.pos += len + 1;
                &self.source[value_start..value_start + len]
            }
            Some(_) => {
                let value_start = self.pos;
                while self
                    .peek()
                    .is_some_and(|ch| !ch.is_whitespace() && ch != '>' && !self.rest().starts_with("/>"))
                {
                    self.bump();
                }
                &self.source[value_start..self.pos]
            }
            None => return Err(ParseError::UnexpectedEof(self.pos)),
        };

        Ok((name, decode_entities(value)))
    }
}

// =============================================================================
// Character References
// =============================================================================

/// Decode named and numeric character references. Unknown references are
/// kept verbatim.
fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let decoded = rest[1..]
            .find(';')
            .filter(|end| *end <= 10)
            .and_then(|end| decode_reference(&rest[1..1 + end]).map(|ch| (ch, end + 2)));
        match decoded {
            Some((ch, consumed)) => {
                out.push(ch);
                rest = &rest[consumed..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_reference(name: &str) -> Option<char> {
    if let Some(number) = name.strip_prefix('#') {
        let code = match number.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => number.parse().ok()?,
        };
        return char::from_u32(code);
    }
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => None,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn element(node: &VNode) -> &crate::vtree::VElement {
        match node {
            VNode::Element(element) => element,
            other => panic!("expected element, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_simple_element() {
        let tree = parse("  <span>hi</span>\n").unwrap();
        let span = element(&tree);
        assert_eq!(span.tag, "span");
        assert_eq!(span.children, vec![VNode::text("hi")]);
    }

    #[test]
    fn test_attributes() {
        let tree = parse(r#"<INPUT type="checkbox" checked data-id=7 title='a "b"'>"#).unwrap();
        let input = element(&tree);
        assert_eq!(input.tag, "input", "tags are lowercased");
        assert_eq!(input.properties.get("type").map(String::as_str), Some("checkbox"));
        assert_eq!(input.properties.get("checked").map(String::as_str), Some(""));
        assert_eq!(input.properties.get("data-id").map(String::as_str), Some("7"));
        assert_eq!(input.properties.get("title").map(String::as_str), Some("a \"b\""));
        assert!(input.children.is_empty(), "void elements take no children");
    }

    #[test]
    fn test_self_closing_component_tag() {
        let tree = parse(r#"<div><main greeting="hi"/></div>"#).unwrap();
        let div = element(&tree);
        assert_eq!(div.children.len(), 1);
        let main = element(&div.children[0]);
        assert_eq!(main.tag, "main");
        assert_eq!(main.properties.get("greeting").map(String::as_str), Some("hi"));
    }

    #[test]
    fn test_nested_text_and_entities() {
        let tree = parse("<p>a &lt; b &amp;&amp; <b>c</b> &#65;&#x42; &bogus;</p>").unwrap();
        let p = element(&tree);
        assert_eq!(p.children.len(), 3);
        assert_eq!(p.children[0], VNode::text("a < b && "));
        assert_eq!(p.children[2], VNode::text(" AB &bogus;"));
    }

    #[test]
    fn test_comments_and_doctype_skipped() {
        let tree = parse("<!doctype html><div><!-- note -->x</div>").unwrap();
        assert_eq!(element(&tree).children, vec![VNode::text("x")]);
    }

    #[test]
    fn test_lone_angle_bracket_is_text() {
        let tree = parse("<p>1 < 2</p>").unwrap();
        assert_eq!(element(&tree).children, vec![VNode::text("1 < 2")]);
    }

    #[test]
    fn test_text_root() {
        assert_eq!(parse("  hello ").unwrap(), VNode::text("hello"));
    }

    #[test]
    fn test_errors() {
        assert_eq!(parse("   "), Err(ParseError::Empty));
        assert_eq!(parse("<a></a><b></b>"), Err(ParseError::MultipleRoots(2)));
        assert!(matches!(
            parse("<div><span></div>"),
            Err(ParseError::MismatchedClose { .. })
        ));
        assert!(matches!(parse("<div>"), Err(ParseError::Unclosed { offset: 0, .. })));
        assert!(matches!(parse("</div>"), Err(ParseError::UnexpectedClose { .. })));
        assert!(matches!(parse("<div a=\"x></div>"), Err(ParseError::UnexpectedEof(_))));
    }
}
