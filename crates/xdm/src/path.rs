//! Ancestor chains from the document down to a target node.

use crate::traverse::{Visitor, walk_document, walk_element};
use crate::types::{Attribute, Document, Element, Id, NodeRef, Text};
use std::ops::ControlFlow;

struct PathFinder<'a> {
    target: Id,
    ancestors: Vec<NodeRef<'a>>,
    found: Option<Vec<NodeRef<'a>>>,
}

impl<'a> PathFinder<'a> {
    fn hit(&mut self, node: NodeRef<'a>) -> ControlFlow<()> {
        if node.id() != self.target {
            return ControlFlow::Continue(());
        }
        let mut path = Vec::with_capacity(self.ancestors.len() + 1);
        path.push(node);
        path.extend(self.ancestors.iter().rev().copied());
        self.found = Some(path);
        ControlFlow::Break(())
    }
}

impl<'a> Visitor<'a> for PathFinder<'a> {
    fn visit_document(&mut self, document: &'a Document) -> ControlFlow<()> {
        self.ancestors.push(NodeRef::Document(document));
        let flow = walk_document(self, document);
        self.ancestors.pop();
        flow
    }

    fn visit_element(&mut self, element: &'a Element) -> ControlFlow<()> {
        self.hit(NodeRef::Element(element))?;
        self.ancestors.push(NodeRef::Element(element));
        let flow = walk_element(self, element);
        self.ancestors.pop();
        flow
    }

    fn visit_attribute(&mut self, attribute: &'a Attribute) -> ControlFlow<()> {
        self.hit(NodeRef::Attribute(attribute))
    }

    fn visit_text(&mut self, text: &'a Text) -> ControlFlow<()> {
        self.hit(NodeRef::Text(text))
    }
}

/// Path from `target` up to the document: `[target, parent, …, document]`.
///
/// Empty when `target` is the document itself, unassigned, or not in the tree.
/// The first match in document order wins.
pub fn find_path(document: &Document, target: Id) -> Vec<NodeRef<'_>> {
    if !target.is_assigned() || target == document.id() {
        return Vec::new();
    }
    let mut finder = PathFinder {
        target,
        ancestors: Vec::new(),
        found: None,
    };
    let _ = document.accept(&mut finder);
    finder.found.unwrap_or_default()
}

/// Direct parent (element or document) of `target`, if it is in the tree.
pub fn parent_of(document: &Document, target: Id) -> Option<NodeRef<'_>> {
    find_path(document, target).get(1).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    fn labels(path: &[NodeRef<'_>]) -> Vec<String> {
        path.iter()
            .map(|node| match node {
                NodeRef::Document(_) => "doc".to_string(),
                NodeRef::Element(e) => e.local_name().to_string(),
                NodeRef::Attribute(a) => format!("@{}", a.name()),
                NodeRef::Text(t) => format!("'{}'", t.text()),
            })
            .collect()
    }

    #[test]
    fn path_runs_innermost_first() {
        let doc = parse("<a><b x=\"1\"><c>t</c></b><d/></a>").expect("parse");
        let a = doc.root_element().expect("a");
        let b = a.children()[0].as_element().expect("b");
        let c = b.children()[0].as_element().expect("c");

        assert_eq!(labels(&find_path(&doc, c.id())), vec!["c", "b", "a", "doc"]);
        assert_eq!(
            labels(&find_path(&doc, c.children()[0].id())),
            vec!["'t'", "c", "b", "a", "doc"]
        );
        assert_eq!(
            labels(&find_path(&doc, b.attributes()[0].id())),
            vec!["@x", "b", "a", "doc"]
        );
        assert_eq!(labels(&find_path(&doc, a.id())), vec!["a", "doc"]);
        let d = a.children()[1].id();
        assert!(matches!(parent_of(&doc, d), Some(NodeRef::Element(e)) if e.id() == a.id()));
    }

    #[test]
    fn empty_for_document_and_missing_targets() {
        let doc = parse("<a/>").expect("parse");
        assert!(find_path(&doc, doc.id()).is_empty());
        assert!(find_path(&doc, Id::UNASSIGNED).is_empty());
        assert!(find_path(&doc, Id(1_000)).is_empty());
        assert!(parent_of(&doc, Id(1_000)).is_none());
    }

    #[test]
    fn top_level_comments_are_document_children() {
        let doc = parse("<!--x--><a/>").expect("parse");
        let comment = doc.children()[0].id();
        assert_eq!(labels(&find_path(&doc, comment)), vec!["'x'", "doc"]);
    }
}
