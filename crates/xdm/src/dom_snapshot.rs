use crate::compare::nodes_equal;
use crate::types::{Document, NodeRef, Token};
use std::fmt::{self, Write};
use std::sync::OnceLock;

/// Deterministic tree rendering and node-by-node comparison for tests.
/// Not a public stable format; intended for internal test comparisons.
///
/// Equivalence rules:
/// - Node kinds must match.
/// - With `structural` (the default), every pair must satisfy `nodes_equal`:
///   names, values and token shape.
/// - Without it, only semantic content counts: qualified names, attribute
///   names and decoded values, text content.
/// - Attribute and child order is significant.
/// - IDs can be ignored by options.
#[derive(Clone, Copy, Debug)]
pub struct DomSnapshotOptions {
    pub ignore_ids: bool,
    pub structural: bool,
}

impl Default for DomSnapshotOptions {
    fn default() -> Self {
        Self {
            ignore_ids: true,
            structural: true,
        }
    }
}

#[derive(Debug)]
pub struct DomSnapshot {
    lines: Vec<String>,
}

impl DomSnapshot {
    pub fn new(root: NodeRef<'_>, options: DomSnapshotOptions) -> Self {
        let mut lines = Vec::new();
        walk_snapshot(root, &options, 0, &mut lines);
        Self { lines }
    }

    pub fn as_lines(&self) -> &[String] {
        &self.lines
    }

    pub fn render(&self) -> String {
        self.lines.join("\n")
    }
}

impl fmt::Display for DomSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

#[derive(Debug)]
pub struct DomMismatch<'a> {
    path: String,
    detail: String,
    expected: String,
    actual: String,
    expected_node: NodeRef<'a>,
    actual_node: NodeRef<'a>,
    options: DomSnapshotOptions,
    expected_subtree: OnceLock<String>,
    actual_subtree: OnceLock<String>,
}

impl DomMismatch<'_> {
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for DomMismatch<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let expected_subtree = self
            .expected_subtree
            .get_or_init(|| DomSnapshot::new(self.expected_node, self.options).render());
        let actual_subtree = self
            .actual_subtree
            .get_or_init(|| DomSnapshot::new(self.actual_node, self.options).render());
        writeln!(f, "tree mismatch at {}: {}", self.path, self.detail)?;
        writeln!(f, "expected: {}", self.expected)?;
        writeln!(f, "actual:   {}", self.actual)?;
        writeln!(f, "expected subtree:\n{expected_subtree}")?;
        writeln!(f, "actual subtree:\n{actual_subtree}")?;
        Ok(())
    }
}

impl std::error::Error for DomMismatch<'_> {}

pub fn assert_dom_eq(expected: &Document, actual: &Document, options: DomSnapshotOptions) {
    if let Err(mismatch) = compare_dom(expected, actual, options) {
        panic!("{mismatch}");
    }
}

pub fn compare_dom<'a>(
    expected: &'a Document,
    actual: &'a Document,
    options: DomSnapshotOptions,
) -> Result<(), Box<DomMismatch<'a>>> {
    let mut path = vec![node_label(expected.as_node_ref())];
    compare_nodes(expected.as_node_ref(), actual.as_node_ref(), &options, &mut path)
}

fn compare_nodes<'a>(
    expected: NodeRef<'a>,
    actual: NodeRef<'a>,
    options: &DomSnapshotOptions,
    path: &mut Vec<String>,
) -> Result<(), Box<DomMismatch<'a>>> {
    let fail = |path: &[String], detail: &str| {
        Err(Box::new(mismatch(path, detail, expected, actual, options)))
    };
    if expected.kind_label() != actual.kind_label() {
        return fail(path, "node kind");
    }
    if !options.ignore_ids && expected.id() != actual.id() {
        return fail(path, "node id");
    }
    if options.structural {
        if !nodes_equal(expected, actual) {
            return fail(path, "structure (value or tokens)");
        }
    } else if semantic_line(expected) != semantic_line(actual) {
        return fail(path, "value");
    }

    let (expected_attrs, actual_attrs) = (expected.attributes(), actual.attributes());
    if expected_attrs.len() != actual_attrs.len() {
        return fail(
            path,
            &format!(
                "attribute count (expected {}, actual {})",
                expected_attrs.len(),
                actual_attrs.len()
            ),
        );
    }
    for (idx, (exp, act)) in expected_attrs.iter().zip(actual_attrs).enumerate() {
        path.push(format!("@{}[{idx}]", exp.name()));
        let result = compare_nodes(NodeRef::Attribute(exp), NodeRef::Attribute(act), options, path);
        path.pop();
        result?;
    }

    let (expected_children, actual_children) = (expected.children(), actual.children());
    if expected_children.len() != actual_children.len() {
        return fail(
            path,
            &format!(
                "child count (expected {}, actual {})",
                expected_children.len(),
                actual_children.len()
            ),
        );
    }
    for (idx, (exp, act)) in expected_children.iter().zip(actual_children).enumerate() {
        path.push(format!("{}[{idx}]", node_label(exp.to_ref())));
        let result = compare_nodes(exp.to_ref(), act.to_ref(), options, path);
        path.pop();
        result?;
    }
    Ok(())
}

fn mismatch<'a>(
    path: &[String],
    detail: &str,
    expected: NodeRef<'a>,
    actual: NodeRef<'a>,
    options: &DomSnapshotOptions,
) -> DomMismatch<'a> {
    let path = format!("/{}", path.join("/"));
    DomMismatch {
        path,
        detail: detail.to_string(),
        expected: truncate_line(format_node_line(expected, options), 160),
        actual: truncate_line(format_node_line(actual, options), 160),
        expected_node: expected,
        actual_node: actual,
        options: *options,
        expected_subtree: OnceLock::new(),
        actual_subtree: OnceLock::new(),
    }
}

fn node_label(node: NodeRef<'_>) -> String {
    match node {
        NodeRef::Document(_) => "#document".to_string(),
        NodeRef::Element(element) => element.qualified_name().into_owned(),
        NodeRef::Attribute(attribute) => format!("@{}", attribute.name()),
        NodeRef::Text(_) => format!("#{}", node.kind_label()),
    }
}

fn truncate_line(mut line: String, max_len: usize) -> String {
    if line.len() > max_len {
        let mut cut = max_len.saturating_sub(3);
        while !line.is_char_boundary(cut) {
            cut -= 1;
        }
        line.truncate(cut);
        line.push_str("...");
    }
    line
}

fn walk_snapshot(node: NodeRef<'_>, options: &DomSnapshotOptions, depth: usize, out: &mut Vec<String>) {
    const INDENT_STEP: usize = 2;
    let mut line = " ".repeat(depth.saturating_mul(INDENT_STEP));
    write_node_line(&mut line, node, options);
    out.push(line);
    for attribute in node.attributes() {
        walk_snapshot(NodeRef::Attribute(attribute), options, depth + 1, out);
    }
    for child in node.children() {
        walk_snapshot(child.to_ref(), options, depth + 1, out);
    }
}

fn format_node_line(node: NodeRef<'_>, options: &DomSnapshotOptions) -> String {
    let mut line = String::new();
    write_node_line(&mut line, node, options);
    line
}

fn semantic_line(node: NodeRef<'_>) -> String {
    let options = DomSnapshotOptions {
        ignore_ids: true,
        structural: false,
    };
    format_node_line(node, &options)
}

fn write_node_line(out: &mut String, node: NodeRef<'_>, options: &DomSnapshotOptions) {
    match node {
        NodeRef::Document(_) => out.push_str("#document"),
        NodeRef::Element(element) => {
            out.push('<');
            out.push_str(&element.qualified_name());
            out.push('>');
        }
        NodeRef::Attribute(attribute) => {
            out.push('@');
            out.push_str(attribute.name());
            out.push_str("=\"");
            write_escaped(out, attribute.value());
            out.push('"');
        }
        NodeRef::Text(text) => {
            out.push('#');
            out.push_str(node.kind_label());
            out.push_str(" \"");
            write_escaped(out, &text.text());
            out.push('"');
        }
    }
    if !options.ignore_ids {
        let _ = write!(out, " id={}", node.id().0);
    }
    if options.structural {
        write_tokens(out, node.tokens());
    }
}

fn write_tokens(out: &mut String, tokens: &[Token]) {
    if tokens.is_empty() {
        return;
    }
    out.push_str(" [");
    for (i, token) in tokens.iter().enumerate() {
        if i != 0 {
            out.push(' ');
        }
        out.push_str(token.kind.label());
        out.push_str(":\"");
        write_escaped(out, &token.text);
        out.push('"');
    }
    out.push(']');
}

fn write_escaped(out: &mut String, value: &str) {
    for ch in value.chars() {
        match ch {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            _ if ch.is_ascii() => out.push(ch),
            _ => {
                let _ = write!(out, "\\u{{{:X}}}", ch as u32);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DomSnapshot, DomSnapshotOptions, assert_dom_eq, compare_dom};
    use crate::parse;

    #[test]
    fn dom_eq_ignores_ids_by_default() {
        let expected = parse("<a x=\"1\"><b>hi</b></a>").expect("parse");
        let mut actual = parse("<!--pad--><a x=\"1\"><b>hi</b></a>").expect("parse");
        actual.children.remove(0);
        assert_dom_eq(&expected, &actual, DomSnapshotOptions::default());
    }

    #[test]
    fn dom_mismatch_points_to_text() {
        let expected = parse("<a><p>a</p></a>").expect("parse");
        let actual = parse("<a><p>b</p></a>").expect("parse");
        let err = compare_dom(&expected, &actual, DomSnapshotOptions::default())
            .expect_err("expected mismatch");
        assert_eq!(err.path(), "/#document/a[0]/p[0]/#text[0]");
        assert!(err.to_string().contains("expected: #text \"a\""));
    }

    #[test]
    fn semantic_mode_ignores_formatting() {
        let expected = parse("<a  x='1'>\n  <b/>\n</a>").expect("parse");
        let actual = parse("<a x=\"1\">\n  <b />\n</a>").expect("parse");
        let semantic = DomSnapshotOptions {
            ignore_ids: true,
            structural: false,
        };
        assert!(compare_dom(&expected, &actual, semantic).is_ok());
        let err = compare_dom(&expected, &actual, DomSnapshotOptions::default())
            .expect_err("tokens differ");
        assert_eq!(err.path(), "/#document/a[0]/@x[0]");
    }

    #[test]
    fn snapshot_lists_tokens() {
        let doc = parse("<a k=\"v\"/>").expect("parse");
        let snapshot = DomSnapshot::new(doc.as_node_ref(), DomSnapshotOptions::default());
        assert_eq!(
            snapshot.as_lines(),
            [
                "#document",
                "  <a> [start-tag:\"<a\" empty-tag-close:\"/>\"]",
                "    @k=\"v\" [whitespace:\" \" attr-name:\"k\" attr-equals:\"=\" attr-value:\"\\\"v\\\"\"]",
            ]
        );
    }
}
