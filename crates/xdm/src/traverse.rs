//! Visitor-style tree walking.
//!
//! Dispatch is a `match` over the closed node sum type; a visitor overrides the
//! hooks it cares about and calls the matching `walk_*` function to keep
//! descending. Every hook returns `ControlFlow` so a walk can stop early.

use crate::types::{Attribute, Document, Element, Id, Node, NodeRef, Text};
use std::ops::ControlFlow;

pub trait Visitor<'a> {
    fn visit_document(&mut self, document: &'a Document) -> ControlFlow<()> {
        walk_document(self, document)
    }

    fn visit_element(&mut self, element: &'a Element) -> ControlFlow<()> {
        walk_element(self, element)
    }

    fn visit_attribute(&mut self, _attribute: &'a Attribute) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    fn visit_text(&mut self, _text: &'a Text) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }
}

/// Visit the document's children in order.
pub fn walk_document<'a, V: Visitor<'a> + ?Sized>(
    visitor: &mut V,
    document: &'a Document,
) -> ControlFlow<()> {
    for child in &document.children {
        walk_node(visitor, child)?;
    }
    ControlFlow::Continue(())
}

/// Visit attributes, then children, in document order.
pub fn walk_element<'a, V: Visitor<'a> + ?Sized>(
    visitor: &mut V,
    element: &'a Element,
) -> ControlFlow<()> {
    for attribute in &element.attributes {
        visitor.visit_attribute(attribute)?;
    }
    for child in &element.children {
        walk_node(visitor, child)?;
    }
    ControlFlow::Continue(())
}

pub fn walk_node<'a, V: Visitor<'a> + ?Sized>(visitor: &mut V, node: &'a Node) -> ControlFlow<()> {
    match node {
        Node::Element(element) => visitor.visit_element(element),
        Node::Text(text) => visitor.visit_text(text),
    }
}

impl<'a> NodeRef<'a> {
    pub fn accept<V: Visitor<'a> + ?Sized>(self, visitor: &mut V) -> ControlFlow<()> {
        match self {
            NodeRef::Document(document) => visitor.visit_document(document),
            NodeRef::Element(element) => visitor.visit_element(element),
            NodeRef::Attribute(attribute) => visitor.visit_attribute(attribute),
            NodeRef::Text(text) => visitor.visit_text(text),
        }
    }
}

impl Node {
    pub fn accept<'a, V: Visitor<'a> + ?Sized>(&'a self, visitor: &mut V) -> ControlFlow<()> {
        walk_node(visitor, self)
    }
}

impl Document {
    pub fn accept<'a, V: Visitor<'a> + ?Sized>(&'a self, visitor: &mut V) -> ControlFlow<()> {
        visitor.visit_document(self)
    }
}

struct FindById<'a> {
    id: Id,
    found: Option<NodeRef<'a>>,
}

impl<'a> FindById<'a> {
    fn check(&mut self, node: NodeRef<'a>) -> ControlFlow<()> {
        if node.id() == self.id {
            self.found = Some(node);
            return ControlFlow::Break(());
        }
        ControlFlow::Continue(())
    }
}

impl<'a> Visitor<'a> for FindById<'a> {
    fn visit_document(&mut self, document: &'a Document) -> ControlFlow<()> {
        self.check(NodeRef::Document(document))?;
        walk_document(self, document)
    }

    fn visit_element(&mut self, element: &'a Element) -> ControlFlow<()> {
        self.check(NodeRef::Element(element))?;
        walk_element(self, element)
    }

    fn visit_attribute(&mut self, attribute: &'a Attribute) -> ControlFlow<()> {
        self.check(NodeRef::Attribute(attribute))
    }

    fn visit_text(&mut self, text: &'a Text) -> ControlFlow<()> {
        self.check(NodeRef::Text(text))
    }
}

/// Node with the given identity, first match in document order.
pub fn find_node(document: &Document, id: Id) -> Option<NodeRef<'_>> {
    if !id.is_assigned() {
        return None;
    }
    let mut finder = FindById { id, found: None };
    let _ = document.accept(&mut finder);
    finder.found
}

/// Mutable lookup of an element below `children`. Takes the child list rather
/// than the document so callers can keep borrowing the document's other fields.
pub(crate) fn find_element_mut(children: &mut [Node], id: Id) -> Option<&mut Element> {
    for child in children {
        if let Node::Element(element) = child {
            if element.id == id {
                return Some(element);
            }
            if let Some(found) = find_element_mut(&mut element.children, id) {
                return Some(found);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    #[derive(Default)]
    struct Trace(Vec<String>);

    impl<'a> Visitor<'a> for Trace {
        fn visit_document(&mut self, document: &'a Document) -> ControlFlow<()> {
            self.0.push("doc".into());
            walk_document(self, document)
        }

        fn visit_element(&mut self, element: &'a Element) -> ControlFlow<()> {
            self.0.push(format!("<{}>", element.qualified_name()));
            walk_element(self, element)
        }

        fn visit_attribute(&mut self, attribute: &'a Attribute) -> ControlFlow<()> {
            self.0.push(format!("@{}", attribute.name()));
            ControlFlow::Continue(())
        }

        fn visit_text(&mut self, text: &'a Text) -> ControlFlow<()> {
            self.0.push(format!("'{}'", text.text()));
            ControlFlow::Continue(())
        }
    }

    #[test]
    fn walks_in_document_order() {
        let doc = parse("<!--c--><r a=\"1\" b=\"2\"><x y=\"3\">t</x><z/></r>").expect("parse");
        let mut trace = Trace::default();
        let _ = doc.accept(&mut trace);
        assert_eq!(
            trace.0,
            vec!["doc", "'c'", "<r>", "@a", "@b", "<x>", "@y", "'t'", "<z>"]
        );
    }

    #[test]
    fn default_hooks_reach_every_node() {
        struct CountText(usize);
        impl<'a> Visitor<'a> for CountText {
            fn visit_text(&mut self, _text: &'a Text) -> ControlFlow<()> {
                self.0 += 1;
                ControlFlow::Continue(())
            }
        }
        let doc = parse("<r>a<b>c<![CDATA[d]]></b><!--e--></r>").expect("parse");
        let mut count = CountText(0);
        let _ = doc.accept(&mut count);
        assert_eq!(count.0, 4);
    }

    #[test]
    fn break_stops_the_walk() {
        struct FirstElement(Vec<String>);
        impl<'a> Visitor<'a> for FirstElement {
            fn visit_element(&mut self, element: &'a Element) -> ControlFlow<()> {
                self.0.push(element.local_name().to_string());
                if element.local_name() == "b" {
                    return ControlFlow::Break(());
                }
                walk_element(self, element)
            }
        }
        let doc = parse("<a><b><c/></b><d/></a>").expect("parse");
        let mut visitor = FirstElement(Vec::new());
        assert!(doc.accept(&mut visitor).is_break());
        assert_eq!(visitor.0, vec!["a", "b"]);
    }

    #[test]
    fn finds_nodes_by_id() {
        let doc = parse("<r k=\"v\"><a/>text</r>").expect("parse");
        let root = doc.root_element().expect("root");
        let attr_id = root.attributes()[0].id();
        assert!(matches!(find_node(&doc, attr_id), Some(NodeRef::Attribute(a)) if a.name() == "k"));
        assert!(matches!(find_node(&doc, doc.id()), Some(NodeRef::Document(_))));
        assert!(find_node(&doc, Id(999)).is_none());
        assert!(find_node(&doc, Id::UNASSIGNED).is_none());
    }
}
