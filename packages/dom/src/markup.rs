//! # Markup Parsing and Serialisation
//!
//! Builds tree fragments from markup strings. Parsing never fails: the
//! builder repairs structure the way browsers do and records each repair as
//! a [`StructureFix`] so callers can report it.

use crate::lexer::{ContentToken, TagToken};
use crate::tree::{Element, NodeId, NodeKind, Tree};
use logos::Logos;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::ops::Range;
use tracing::debug;

/// Elements that never have children or a close tag
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

pub fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

/// Kind of structural repair applied while building a fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixKind {
    /// An element was still open when its parent (or the input) ended
    CloseUnclosedTag,
    /// A close tag matched no open element and was ignored
    DropOrphanCloseTag,
}

/// A structural repair, located in the source markup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructureFix {
    pub kind: FixKind,
    pub tag: String,
    pub span: Range<usize>,
}

impl std::fmt::Display for StructureFix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            FixKind::CloseUnclosedTag => write!(f, "Added missing end tag </{}>", self.tag),
            FixKind::DropOrphanCloseTag => write!(f, "Dropped orphan end tag </{}>", self.tag),
        }
    }
}

/// Result of parsing markup into a tree
#[derive(Debug, Clone)]
pub struct ParsedFragment {
    /// Parentless fragment node holding the parsed forest
    pub root: NodeId,
    pub fixes: Vec<StructureFix>,
}

struct OpenElement {
    node: NodeId,
    tag: String,
    span: Range<usize>,
}

/// Parse `source` into a new fragment owned by `tree`
pub fn parse_fragment(tree: &mut Tree, source: &str) -> ParsedFragment {
    let root = tree.create_fragment();
    let mut fixes = Vec::new();
    let mut open: Vec<OpenElement> = Vec::new();

    let mut content = ContentToken::lexer(source);

    while let Some(token) = content.next() {
        let parent = open.last().map(|e| e.node).unwrap_or(root);
        let span = content.span();

        match token {
            Ok(ContentToken::Text(text)) => {
                append_text(tree, parent, &decode_entities(text));
            }
            Ok(ContentToken::StrayLt) | Err(()) => {
                append_text(tree, parent, content.slice());
            }
            Ok(ContentToken::Comment(text)) => {
                let node = tree.create_comment(text);
                link(tree, parent, node);
            }
            Ok(ContentToken::Declaration) => {}
            Ok(ContentToken::OpenTag(name)) => {
                let tag = name.to_ascii_lowercase();
                let mut element = Element::new(tag.clone());

                let mut attrs = content.morph::<TagToken>();
                let self_closing = read_attributes(&mut attrs, &mut element);
                let end = attrs.span().end;
                content = attrs.morph();

                let node = tree.create_element(element);
                link(tree, parent, node);

                if !self_closing && !is_void_element(&tag) {
                    open.push(OpenElement {
                        node,
                        tag,
                        span: span.start..end,
                    });
                }
            }
            Ok(ContentToken::CloseTag(name)) => {
                let tag = name.to_ascii_lowercase();
                match open.iter().rposition(|e| e.tag == tag) {
                    Some(index) => {
                        for unclosed in open.drain(index + 1..) {
                            fixes.push(StructureFix {
                                kind: FixKind::CloseUnclosedTag,
                                tag: unclosed.tag,
                                span: unclosed.span,
                            });
                        }
                        open.pop();
                    }
                    None => {
                        if !is_void_element(&tag) {
                            fixes.push(StructureFix {
                                kind: FixKind::DropOrphanCloseTag,
                                tag,
                                span,
                            });
                        }
                    }
                }
            }
        }
    }

    // Innermost first, matching the order in which they would have closed
    for unclosed in open.into_iter().rev() {
        fixes.push(StructureFix {
            kind: FixKind::CloseUnclosedTag,
            tag: unclosed.tag,
            span: unclosed.span,
        });
    }

    if !fixes.is_empty() {
        debug!(fixes = fixes.len(), "Repaired markup structure");
    }

    ParsedFragment { root, fixes }
}

/// Read attributes up to the end of the tag. Returns true for `/>`.
fn read_attributes<'src>(
    lexer: &mut logos::Lexer<'src, TagToken<'src>>,
    element: &mut Element,
) -> bool {
    let mut pending_name: Option<&'src str> = None;
    let mut expecting_value = false;

    while let Some(token) = lexer.next() {
        match token {
            Ok(TagToken::Name(text)) | Ok(TagToken::Quoted(text)) if expecting_value => {
                if let Some(name) = pending_name.take() {
                    push_attribute(element, name, decode_entities(text));
                }
                expecting_value = false;
            }
            Ok(TagToken::Name(text)) => {
                if let Some(name) = pending_name.replace(text) {
                    push_attribute(element, name, Cow::Borrowed(""));
                }
            }
            Ok(TagToken::Eq) => {
                expecting_value = pending_name.is_some();
            }
            Ok(TagToken::End) => {
                if let Some(name) = pending_name.take() {
                    push_attribute(element, name, Cow::Borrowed(""));
                }
                return false;
            }
            Ok(TagToken::SelfClose) => {
                if let Some(name) = pending_name.take() {
                    push_attribute(element, name, Cow::Borrowed(""));
                }
                return true;
            }
            Ok(TagToken::Quoted(_)) | Ok(TagToken::Slash) | Err(()) => {
                expecting_value = false;
            }
        }
    }

    // Input ended inside the tag
    if let Some(name) = pending_name {
        push_attribute(element, name, Cow::Borrowed(""));
    }
    false
}

/// First occurrence of an attribute wins
fn push_attribute(element: &mut Element, name: &str, value: Cow<'_, str>) {
    let name = name.to_ascii_lowercase();
    if element.attribute(&name).is_none() {
        element.attributes.push((name, value.into_owned()));
    }
}

fn link(tree: &mut Tree, parent: NodeId, node: NodeId) {
    // Fresh nodes under a container parent cannot fail to link
    if let Err(error) = tree.append_child(parent, node) {
        debug!(%error, "Dropped node while building fragment");
    }
}

/// Append text, merging with a preceding text node
fn append_text(tree: &mut Tree, parent: NodeId, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(last) = tree.last_child(parent) {
        if let NodeKind::Text(existing) = tree.kind_mut(last) {
            existing.push_str(text);
            return;
        }
    }
    let node = tree.create_text(text);
    link(tree, parent, node);
}

/// Decode the character references used by server-rendered markup
pub fn decode_entities(text: &str) -> Cow<'_, str> {
    if !text.contains('&') {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let decoded = rest.find(';').and_then(|semi| {
            let name = &rest[1..semi];
            decode_reference(name).map(|c| (c, semi + 1))
        });

        match decoded {
            Some((c, consumed)) => {
                out.push(c);
                rest = &rest[consumed..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);

    Cow::Owned(out)
}

fn decode_reference(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let number = name.strip_prefix('#')?;
            let code = match number.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => number.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
}

fn escape_attribute(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
}

/// Serialise a node (a fragment serialises as its children)
pub fn to_markup(tree: &Tree, node: NodeId) -> String {
    let mut out = String::new();
    write_markup(tree, node, &mut out);
    out
}

fn write_markup(tree: &Tree, node: NodeId, out: &mut String) {
    match tree.kind(node) {
        NodeKind::Fragment => {
            for child in tree.children(node) {
                write_markup(tree, child, out);
            }
        }
        NodeKind::Text(text) => escape_text(text, out),
        NodeKind::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        NodeKind::Element(element) => {
            out.push('<');
            out.push_str(&element.tag);
            for (name, value) in &element.attributes {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                escape_attribute(value, out);
                out.push('"');
            }
            out.push('>');
            if !is_void_element(&element.tag) {
                for child in tree.children(node) {
                    write_markup(tree, child, out);
                }
                out.push_str("</");
                out.push_str(&element.tag);
                out.push('>');
            }
        }
    }
}

/// Pretty-print structure fixes with source context using ariadne
#[cfg(feature = "pretty-errors")]
pub fn format_fixes(source: &str, filename: &str, fixes: &[StructureFix]) -> String {
    use ariadne::{Color, Label, Report, ReportKind, Source};

    let mut output = Vec::new();

    for fix in fixes {
        let span = fix.span.start.min(source.len())..fix.span.end.min(source.len());
        let color = match fix.kind {
            FixKind::CloseUnclosedTag => Color::Yellow,
            FixKind::DropOrphanCloseTag => Color::Red,
        };

        let report = Report::build(ReportKind::Warning, filename, span.start)
            .with_message(fix.to_string())
            .with_label(
                Label::new((filename, span))
                    .with_color(color)
                    .with_message(match fix.kind {
                        FixKind::CloseUnclosedTag => "opened here, never closed",
                        FixKind::DropOrphanCloseTag => "no matching open tag",
                    }),
            )
            .finish();

        if report
            .write((filename, Source::from(source)), &mut output)
            .is_err()
        {
            break;
        }
    }

    String::from_utf8(output).unwrap_or_else(|_| "Fix formatting failed".to_string())
}
