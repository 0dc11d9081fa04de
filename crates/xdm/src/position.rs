//! Byte offset ↔ node mapping over the flushed text.
//!
//! Offsets are UTF-8 byte offsets into `flush(document)`. Intervals are
//! half-open. An element spans from its start tag to the end of its close
//! token; trailing whitespace it owns falls inside the parent's interval. An
//! attribute starts at its name (its leading separator belongs to the element).
//! Nothing is cached: every query re-walks the tree.

use crate::types::{Attribute, Document, Element, Id, Node, NodeRef, Text, Token};
use std::ops::{ControlFlow, Range};

struct SpanWalker<'a, F> {
    offset: usize,
    ancestors: Vec<&'a Element>,
    on_span: F,
}

impl<'a, F> SpanWalker<'a, F>
where
    F: FnMut(NodeRef<'a>, Range<usize>, &[&'a Element]) -> ControlFlow<()>,
{
    fn advance(&mut self, tokens: &[Token]) {
        self.offset += tokens.iter().map(Token::len).sum::<usize>();
    }

    fn document(&mut self, document: &'a Document) -> ControlFlow<()> {
        self.advance(&document.tokens);
        self.children(&document.children)?;
        (self.on_span)(NodeRef::Document(document), 0..self.offset, &self.ancestors)
    }

    fn children(&mut self, children: &'a [Node]) -> ControlFlow<()> {
        for child in children {
            match child {
                Node::Element(element) => self.element(element)?,
                Node::Text(text) => self.text(text)?,
            }
        }
        ControlFlow::Continue(())
    }

    fn element(&mut self, element: &'a Element) -> ControlFlow<()> {
        let layout = element.layout();
        let tokens = &element.tokens;
        let head = tokens.len().min(1);
        let content_start = layout.content_start.max(head);
        let close_end = layout.close_end.max(content_start);

        let start = self.offset;
        self.advance(&tokens[..head]);
        self.ancestors.push(element);
        for attribute in &element.attributes {
            self.attribute(attribute)?;
        }
        self.advance(&tokens[head..content_start]);
        self.children(&element.children)?;
        self.ancestors.pop();
        self.advance(&tokens[content_start..close_end]);
        let end = self.offset;
        (self.on_span)(NodeRef::Element(element), start..end, &self.ancestors)?;
        self.advance(&tokens[close_end..]);
        ControlFlow::Continue(())
    }

    fn attribute(&mut self, attribute: &'a Attribute) -> ControlFlow<()> {
        let leading = attribute.leading_len();
        self.advance(&attribute.tokens[..leading]);
        let start = self.offset;
        self.advance(&attribute.tokens[leading..]);
        (self.on_span)(
            NodeRef::Attribute(attribute),
            start..self.offset,
            &self.ancestors,
        )
    }

    fn text(&mut self, text: &'a Text) -> ControlFlow<()> {
        let content_end = text.content_end();
        let start = self.offset;
        self.advance(&text.tokens[..content_end]);
        (self.on_span)(NodeRef::Text(text), start..self.offset, &self.ancestors)?;
        self.advance(&text.tokens[content_end..]);
        ControlFlow::Continue(())
    }
}

/// Spans are reported post-order: descendants before their ancestors.
fn walk_spans<'a, F>(document: &'a Document, on_span: F)
where
    F: FnMut(NodeRef<'a>, Range<usize>, &[&'a Element]) -> ControlFlow<()>,
{
    let mut walker = SpanWalker {
        offset: 0,
        ancestors: Vec::new(),
        on_span,
    };
    let _ = walker.document(document);
}

/// Interval of the node with identity `id`.
pub fn node_span(document: &Document, id: Id) -> Option<Range<usize>> {
    if !id.is_assigned() {
        return None;
    }
    let mut found = None;
    walk_spans(document, |node, span, _| {
        if node.id() == id {
            found = Some(span);
            return ControlFlow::Break(());
        }
        ControlFlow::Continue(())
    });
    found
}

/// Offset where the node's own text begins.
pub fn find_position(document: &Document, id: Id) -> Option<usize> {
    node_span(document, id).map(|span| span.start)
}

fn containing<'a>(document: &'a Document, offset: usize) -> Option<(NodeRef<'a>, Option<&'a Element>)> {
    let mut found = None;
    // Post-order, so the first interval that contains `offset` is the deepest one.
    walk_spans(document, |node, span, ancestors| {
        if span.contains(&offset) {
            found = Some((node, ancestors.last().copied()));
            return ControlFlow::Break(());
        }
        ControlFlow::Continue(())
    });
    found
}

/// Deepest node whose interval contains `offset`; `None` past the end of the text.
pub fn containing_node(document: &Document, offset: usize) -> Option<NodeRef<'_>> {
    containing(document, offset).map(|(node, _)| node)
}

/// Element containing `offset`. Text and attribute hits resolve to their
/// nearest enclosing element; offsets outside the root element give `None`.
pub fn containing_element(document: &Document, offset: usize) -> Option<&Element> {
    match containing(document, offset)? {
        (NodeRef::Element(element), _) => Some(element),
        (NodeRef::Attribute(_) | NodeRef::Text(_), parent) => parent,
        (NodeRef::Document(_), _) => None,
    }
}
