use crate::traverse::{Visitor, walk_document};
use crate::types::{Attribute, Document, Element, Text, TextKind, preview};
use std::fmt::Write;
use std::ops::ControlFlow;

const INDENT_STEP: &str = "  ";
const PREVIEW_CHARS: usize = 40;
const MAX_ATTRIBUTES: usize = 3;

fn trimmed_nonempty_slice(s: &str) -> Option<&str> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

fn push_preview_replace_newlines(out: &mut String, s: &str) {
    for ch in preview(s, PREVIEW_CHARS).chars() {
        out.push(if ch == '\n' { ' ' } else { ch });
    }
}

fn first_attributes(attributes: &[Attribute]) -> String {
    let mut out = String::new();
    for attribute in attributes.iter().take(MAX_ATTRIBUTES) {
        let _ = write!(&mut out, " {}=\"{}\"", attribute.name(), attribute.value());
    }
    if attributes.len() > MAX_ATTRIBUTES {
        out.push_str(" …");
    }
    out
}

struct Outline {
    indent: String,
    lines: Vec<String>,
    left: usize,
}

impl Outline {
    fn push(&mut self, body: impl FnOnce(&mut String)) -> ControlFlow<()> {
        if self.left == 0 {
            return ControlFlow::Break(());
        }
        self.left -= 1;
        let mut line = String::with_capacity(self.indent.len() + 64);
        line.push_str(&self.indent);
        body(&mut line);
        self.lines.push(line);
        ControlFlow::Continue(())
    }

    fn nested(&mut self, walk: impl FnOnce(&mut Self) -> ControlFlow<()>) -> ControlFlow<()> {
        self.indent.push_str(INDENT_STEP);
        let flow = walk(self);
        let new_len = self.indent.len() - INDENT_STEP.len();
        self.indent.truncate(new_len);
        flow
    }
}

impl<'a> Visitor<'a> for Outline {
    fn visit_document(&mut self, document: &'a Document) -> ControlFlow<()> {
        self.push(|line| {
            let _ = write!(line, "#document {}", document.id());
        })?;
        self.nested(|outline| walk_document(outline, document))
    }

    fn visit_element(&mut self, element: &'a Element) -> ControlFlow<()> {
        self.push(|line| {
            let _ = write!(
                line,
                "<{}{}> {}",
                element.qualified_name(),
                first_attributes(element.attributes()),
                element.id()
            );
        })?;
        // attributes are already on the element's line
        self.nested(|outline| {
            for child in element.children() {
                child.accept(outline)?;
            }
            ControlFlow::Continue(())
        })
    }

    fn visit_text(&mut self, text: &'a Text) -> ControlFlow<()> {
        let content = text.text();
        match text.kind() {
            TextKind::Plain => {
                let Some(trimmed) = trimmed_nonempty_slice(&content) else {
                    return ControlFlow::Continue(());
                };
                self.push(|line| {
                    line.push('"');
                    push_preview_replace_newlines(line, trimmed);
                    line.push('"');
                })
            }
            TextKind::CData => self.push(|line| {
                line.push_str("<![CDATA[ ");
                push_preview_replace_newlines(line, &content);
                line.push_str(" ]]>");
            }),
            TextKind::Comment => self.push(|line| {
                line.push_str("<!-- ");
                push_preview_replace_newlines(line, &content);
                line.push_str(" -->");
            }),
            TextKind::ProcessingInstruction => self.push(|line| {
                let literal = text.tokens().first().map(|t| t.text.as_str()).unwrap_or("");
                push_preview_replace_newlines(line, literal);
            }),
        }
    }
}

/// Indented one-line-per-node outline, at most `cap` lines.
pub fn outline(document: &Document, cap: usize) -> Vec<String> {
    let mut outline = Outline {
        indent: String::new(),
        lines: Vec::new(),
        left: cap,
    };
    let _ = document.accept(&mut outline);
    outline.lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    #[test]
    fn outlines_nested_structure() {
        let doc = parse(
            "<?xml version=\"1.0\"?>\n<!--top-->\n<r a=\"1\" b=\"2\" c=\"3\" d=\"4\">\n  <x>  hello\n world  </x>\n  <![CDATA[raw]]><?pi data?>\n</r>\n",
        )
        .expect("parse");
        let lines = outline(&doc, usize::MAX);
        assert_eq!(
            lines,
            vec![
                "#document #1",
                "  <!-- top -->",
                "  <r a=\"1\" b=\"2\" c=\"3\" …> #3",
                "    <x> #8",
                "      \"hello  world\"",
                "    <![CDATA[ raw ]]>",
                "    <?pi data?>",
            ]
        );
    }

    #[test]
    fn cap_limits_lines() {
        let doc = parse("<r><a/><b/><c/></r>").expect("parse");
        assert_eq!(outline(&doc, 3).len(), 3);
        assert!(outline(&doc, 0).is_empty());
    }
}
