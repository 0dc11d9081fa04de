//! Serialization back to text by concatenating tokens in flush order.

use crate::types::{Attribute, Document, Element, Node, NodeRef, Text, Token};
use std::fmt::{self, Write};

/// Literal text of the whole document.
///
/// For any parsed input `flush(&parse(text)?) == text`.
pub fn flush(document: &Document) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_document(&mut out, document);
    out
}

/// Literal text of a single node, including whitespace it owns after itself.
pub fn flush_node(node: NodeRef<'_>) -> String {
    let mut out = String::new();
    let _ = match node {
        NodeRef::Document(document) => write_document(&mut out, document),
        NodeRef::Element(element) => write_element(&mut out, element),
        NodeRef::Attribute(attribute) => write_attribute(&mut out, attribute),
        NodeRef::Text(text) => write_text(&mut out, text),
    };
    out
}

fn write_tokens<W: Write>(out: &mut W, tokens: &[Token]) -> fmt::Result {
    for token in tokens {
        out.write_str(&token.text)?;
    }
    Ok(())
}

pub(crate) fn write_document<W: Write>(out: &mut W, document: &Document) -> fmt::Result {
    write_tokens(out, &document.tokens)?;
    write_children(out, &document.children)
}

fn write_children<W: Write>(out: &mut W, children: &[Node]) -> fmt::Result {
    for child in children {
        match child {
            Node::Element(element) => write_element(out, element)?,
            Node::Text(text) => write_text(out, text)?,
        }
    }
    Ok(())
}

fn write_element<W: Write>(out: &mut W, element: &Element) -> fmt::Result {
    let layout = element.layout();
    let head = element.tokens.len().min(1);
    write_tokens(out, &element.tokens[..head])?;
    for attribute in &element.attributes {
        write_attribute(out, attribute)?;
    }
    write_tokens(out, &element.tokens[head..layout.content_start.max(head)])?;
    write_children(out, &element.children)?;
    write_tokens(out, &element.tokens[layout.content_start.max(head)..])
}

fn write_attribute<W: Write>(out: &mut W, attribute: &Attribute) -> fmt::Result {
    write_tokens(out, &attribute.tokens)
}

fn write_text<W: Write>(out: &mut W, text: &Text) -> fmt::Result {
    write_tokens(out, &text.tokens)
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_document(f, self)
    }
}
