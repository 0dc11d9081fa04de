//! Token stream to tree.
//!
//! Whitespace ownership, applied while building:
//! - inside a start tag, whitespace before an attribute name belongs to that
//!   attribute, whitespace around `=` too; whitespace before `>` / `/>` and
//!   inside an end tag belongs to the element;
//! - a whitespace-only content run becomes a trailing token of the previous
//!   sibling, or of the parent (element content head / document prolog) when
//!   there is no previous sibling;
//! - a doctype that follows a prolog comment or PI trails that node.
//!
//! Ids are handed out in document order: the document, then each element
//! followed by its attributes, then its children.

use crate::config::ParseConfig;
use crate::entities::decode_entities;
use crate::error::{ParseError, ParseErrorCode};
use crate::types::{
    Attribute, Document, Element, Id, IdAllocator, Node, Text, Token, TokenKind, TokenStream,
};

pub fn build_document(stream: TokenStream, config: &ParseConfig) -> Result<Document, ParseError> {
    let source_len = stream.source_len();
    let mut builder = TreeBuilder::new(config)?;
    let mut tokens = stream.into_tokens().into_iter();

    while let Some((token, offset)) = tokens.next() {
        match token.kind {
            TokenKind::CommentStart => {
                let node = collect_delimited(token, TokenKind::CommentEnd, &mut tokens);
                builder.attach(Node::Text(node), offset)?;
            }
            TokenKind::CDataStart => {
                if builder.open.is_empty() {
                    return Err(ParseError::new(ParseErrorCode::CDataOutsideRoot, offset));
                }
                let node = collect_delimited(token, TokenKind::CDataEnd, &mut tokens);
                builder.attach(Node::Text(node), offset)?;
            }
            TokenKind::StartTag => {
                let element = builder.start_element(token, offset)?;
                let element = builder.finish_start_tag(element, &mut tokens, source_len)?;
                if let Some(element) = element {
                    builder.attach(Node::Element(element), offset)?;
                }
            }
            TokenKind::EndTag => builder.end_element(token, offset, &mut tokens, source_len)?,
            TokenKind::Whitespace => builder.whitespace(token),
            TokenKind::Text => {
                if builder.open.is_empty() {
                    return Err(ParseError::new(ParseErrorCode::TextOutsideRoot, offset));
                }
                builder.attach(Node::Text(Text::from_tokens(vec![token])), offset)?;
            }
            TokenKind::ProcessingInstruction => {
                builder.attach(Node::Text(Text::from_tokens(vec![token])), offset)?;
            }
            TokenKind::XmlDecl => {
                if offset != 0 {
                    return Err(ParseError::new(ParseErrorCode::MisplacedXmlDecl, offset));
                }
                builder.doc_tokens.push(token);
            }
            TokenKind::Doctype => builder.doctype(token, offset)?,
            // The tokenizer only emits these inside constructs handled above.
            TokenKind::TagClose
            | TokenKind::EmptyTagClose
            | TokenKind::AttributeName
            | TokenKind::AttributeEquals
            | TokenKind::AttributeValue
            | TokenKind::CDataBody
            | TokenKind::CDataEnd
            | TokenKind::CommentBody
            | TokenKind::CommentEnd => {
                return Err(ParseError::new(ParseErrorCode::UnexpectedCharacter, offset));
            }
        }
    }

    builder.finish(source_len)
}

struct TreeBuilder {
    max_depth: usize,
    ids: IdAllocator,
    doc_id: Id,
    doc_tokens: Vec<Token>,
    doc_children: Vec<Node>,
    open: Vec<Element>,
    seen_root: bool,
    seen_doctype: bool,
}

impl TreeBuilder {
    fn new(config: &ParseConfig) -> Result<Self, ParseError> {
        let mut ids = IdAllocator::new();
        let doc_id = ids.allocate().map_err(|_| too_many_nodes(0))?;
        Ok(Self {
            max_depth: config.max_depth,
            ids,
            doc_id,
            doc_tokens: Vec::new(),
            doc_children: Vec::new(),
            open: Vec::new(),
            seen_root: false,
            seen_doctype: false,
        })
    }

    /// Elements arrive with ids already handed out; text-like nodes get theirs here.
    fn attach(&mut self, mut node: Node, offset: usize) -> Result<(), ParseError> {
        if let Node::Text(text) = &mut node {
            text.id = self.ids.allocate().map_err(|_| too_many_nodes(offset))?;
        }
        log::trace!(target: "xdm.builder", "attach {} at depth {}", node.id(), self.open.len());
        match self.open.last_mut() {
            Some(parent) => parent.children.push(node),
            None => self.doc_children.push(node),
        }
        Ok(())
    }

    fn whitespace(&mut self, token: Token) {
        let (children, own_tokens) = match self.open.last_mut() {
            Some(parent) => (&mut parent.children, &mut parent.tokens),
            None => (&mut self.doc_children, &mut self.doc_tokens),
        };
        match children.last_mut() {
            Some(previous) => previous.push_trailing(token),
            None => own_tokens.push(token),
        }
    }

    fn doctype(&mut self, token: Token, offset: usize) -> Result<(), ParseError> {
        if self.seen_doctype || self.seen_root || !self.open.is_empty() {
            return Err(ParseError::new(ParseErrorCode::MisplacedDoctype, offset));
        }
        self.seen_doctype = true;
        match self.doc_children.last_mut() {
            Some(previous) => previous.push_trailing(token),
            None => self.doc_tokens.push(token),
        }
        Ok(())
    }

    fn start_element(&mut self, token: Token, offset: usize) -> Result<Element, ParseError> {
        if self.open.is_empty() {
            if self.seen_root {
                return Err(ParseError::new(ParseErrorCode::MultipleRootElements, offset));
            }
            self.seen_root = true;
        }
        if self.open.len() >= self.max_depth {
            return Err(ParseError::new(ParseErrorCode::DepthLimitExceeded, offset));
        }
        let name = token.text[1..].to_string();
        let mut element = Element::from_parts(&name, vec![token]);
        element.id = self.ids.allocate().map_err(|_| too_many_nodes(offset))?;
        Ok(element)
    }

    /// Consume the rest of a start tag. Returns the element when it is already
    /// complete (`/>`), otherwise pushes it onto the open stack.
    fn finish_start_tag(
        &mut self,
        mut element: Element,
        tokens: &mut impl Iterator<Item = (Token, usize)>,
        source_len: usize,
    ) -> Result<Option<Element>, ParseError> {
        let mut pending_ws: Vec<Token> = Vec::new();
        let mut pending_attr: Option<(Vec<Token>, usize)> = None;

        for (token, offset) in tokens.by_ref() {
            match token.kind {
                TokenKind::Whitespace => match pending_attr.as_mut() {
                    Some((attr_tokens, _)) => attr_tokens.push(token),
                    None => pending_ws.push(token),
                },
                TokenKind::AttributeName => {
                    let mut attr_tokens = std::mem::take(&mut pending_ws);
                    attr_tokens.push(token);
                    pending_attr = Some((attr_tokens, offset));
                }
                TokenKind::AttributeEquals => {
                    let Some((attr_tokens, _)) = pending_attr.as_mut() else {
                        return Err(ParseError::new(ParseErrorCode::UnexpectedCharacter, offset));
                    };
                    attr_tokens.push(token);
                }
                TokenKind::AttributeValue => {
                    let Some((mut attr_tokens, name_offset)) = pending_attr.take() else {
                        return Err(ParseError::new(ParseErrorCode::UnexpectedCharacter, offset));
                    };
                    attr_tokens.push(token);
                    self.push_attribute(&mut element, attr_tokens, name_offset)?;
                }
                TokenKind::TagClose | TokenKind::EmptyTagClose => {
                    if let Some((_, name_offset)) = pending_attr {
                        return Err(ParseError::new(
                            ParseErrorCode::MissingAttributeValue,
                            name_offset,
                        ));
                    }
                    let self_closing = token.kind == TokenKind::EmptyTagClose;
                    element.tokens.append(&mut pending_ws);
                    element.tokens.push(token);
                    if self_closing {
                        return Ok(Some(element));
                    }
                    self.open.push(element);
                    return Ok(None);
                }
                _ => return Err(ParseError::new(ParseErrorCode::UnexpectedCharacter, offset)),
            }
        }
        Err(ParseError::new(ParseErrorCode::UnexpectedEof, source_len))
    }

    fn push_attribute(
        &mut self,
        element: &mut Element,
        tokens: Vec<Token>,
        name_offset: usize,
    ) -> Result<(), ParseError> {
        let mut name = None;
        let mut raw = None;
        for token in &tokens {
            match token.kind {
                TokenKind::AttributeName => name = Some(token.text.clone()),
                TokenKind::AttributeValue => raw = Some(token.text.as_str()),
                _ => {}
            }
        }
        let (Some(name), Some(raw)) = (name, raw) else {
            return Err(ParseError::new(
                ParseErrorCode::MissingAttributeValue,
                name_offset,
            ));
        };
        if element.attribute(&name).is_some() {
            return Err(ParseError::new(
                ParseErrorCode::DuplicateAttribute,
                name_offset,
            ));
        }
        // Value token keeps its quotes; both quote characters are one byte.
        let value = decode_entities(&raw[1..raw.len() - 1]);
        let mut attribute = Attribute::from_parts(name, value, tokens);
        self.ids
            .assign_attribute(&mut attribute)
            .map_err(|_| too_many_nodes(name_offset))?;
        element.attributes.push(attribute);
        Ok(())
    }

    fn end_element(
        &mut self,
        token: Token,
        offset: usize,
        tokens: &mut impl Iterator<Item = (Token, usize)>,
        source_len: usize,
    ) -> Result<(), ParseError> {
        let Some(mut element) = self.open.pop() else {
            return Err(ParseError::new(ParseErrorCode::UnexpectedEndTag, offset));
        };
        if token.text[2..] != *element.qualified_name() {
            return Err(ParseError::new(ParseErrorCode::MismatchedEndTag, offset));
        }
        element.tokens.push(token);
        for (token, offset) in tokens.by_ref() {
            match token.kind {
                TokenKind::Whitespace => element.tokens.push(token),
                TokenKind::TagClose => {
                    element.tokens.push(token);
                    return self.attach(Node::Element(element), offset);
                }
                _ => return Err(ParseError::new(ParseErrorCode::UnexpectedCharacter, offset)),
            }
        }
        Err(ParseError::new(ParseErrorCode::UnexpectedEof, source_len))
    }

    fn finish(self, source_len: usize) -> Result<Document, ParseError> {
        if !self.open.is_empty() {
            return Err(ParseError::new(ParseErrorCode::UnexpectedEof, source_len));
        }
        if !self.seen_root {
            return Err(ParseError::new(
                ParseErrorCode::MissingRootElement,
                source_len,
            ));
        }
        log::debug!(
            target: "xdm.builder",
            "built document with {} top-level nodes",
            self.doc_children.len()
        );
        Ok(Document::from_parts(
            self.doc_id,
            self.doc_tokens,
            self.doc_children,
            self.ids,
        ))
    }
}

fn too_many_nodes(offset: usize) -> ParseError {
    ParseError::new(ParseErrorCode::TooManyNodes, offset)
}

fn collect_delimited(
    start: Token,
    end_kind: TokenKind,
    tokens: &mut impl Iterator<Item = (Token, usize)>,
) -> Text {
    let mut collected = vec![start];
    for (token, _) in tokens.by_ref() {
        let done = token.kind == end_kind;
        collected.push(token);
        if done {
            break;
        }
    }
    Text::from_tokens(collected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize;
    use crate::types::TextKind;

    fn build(input: &str) -> Result<Document, ParseError> {
        build_document(tokenize(input)?, &ParseConfig::default())
    }

    fn kinds(tokens: &[Token]) -> Vec<TokenKind> {
        tokens.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn attaches_whitespace_by_position() {
        let doc = build("<r a=\"1\"  b = '2' >\n  <c/>\n</r >\n").expect("parse");
        let root = doc.root_element().expect("root");
        assert_eq!(
            kinds(root.tokens()),
            vec![
                TokenKind::StartTag,
                TokenKind::Whitespace,
                TokenKind::TagClose,
                TokenKind::Whitespace,
                TokenKind::EndTag,
                TokenKind::Whitespace,
                TokenKind::TagClose,
                TokenKind::Whitespace,
            ]
        );
        let b = root.attribute("b").expect("b");
        assert_eq!(b.tokens()[0].text, "  ");
        assert_eq!(b.tokens().len(), 6);
        assert_eq!(b.value(), "2");

        let c = root.children()[0].as_element().expect("c");
        assert_eq!(kinds(c.tokens()), vec![
            TokenKind::StartTag,
            TokenKind::EmptyTagClose,
            TokenKind::Whitespace,
        ]);
    }

    #[test]
    fn ids_follow_document_order() {
        let doc = build("<r x=\"1\"><a y=\"2\"/>t</r>").expect("parse");
        let root = doc.root_element().expect("root");
        assert_eq!(doc.id(), Id(1));
        assert_eq!(root.id(), Id(2));
        assert_eq!(root.attributes()[0].id(), Id(3));
        assert_eq!(root.children()[0].id(), Id(4));
        let a = root.children()[0].as_element().expect("a");
        assert_eq!(a.attributes()[0].id(), Id(5));
        assert_eq!(root.children()[1].id(), Id(6));
    }

    #[test]
    fn prolog_doctype_trails_leading_comment() {
        let doc = build("<?xml version=\"1.0\"?>\n<!--c--><!DOCTYPE r>\n<r/>").expect("parse");
        assert_eq!(
            kinds(doc.tokens()),
            vec![TokenKind::XmlDecl, TokenKind::Whitespace]
        );
        let comment = doc.children()[0].as_text().expect("comment");
        assert_eq!(comment.kind(), TextKind::Comment);
        assert_eq!(
            kinds(&comment.tokens()[comment.content_end()..]),
            vec![TokenKind::Doctype, TokenKind::Whitespace]
        );
    }

    #[test]
    fn decodes_attribute_values() {
        let doc = build("<r v='a &amp; &#x62;'/>").expect("parse");
        let root = doc.root_element().expect("root");
        assert_eq!(root.attribute("v").expect("v").value(), "a & b");
        assert_eq!(root.attribute("v").expect("v").raw_value(), Some("'a &amp; &#x62;'"));
    }

    #[test]
    fn rejects_structural_errors() {
        let cases = [
            ("", ParseErrorCode::MissingRootElement),
            ("<!--only-->", ParseErrorCode::MissingRootElement),
            ("<a/><b/>", ParseErrorCode::MultipleRootElements),
            ("<a></b>", ParseErrorCode::MismatchedEndTag),
            ("<a/></a>", ParseErrorCode::UnexpectedEndTag),
            ("<a>", ParseErrorCode::UnexpectedEof),
            ("x<a/>", ParseErrorCode::TextOutsideRoot),
            ("<a/>x", ParseErrorCode::TextOutsideRoot),
            ("<![CDATA[x]]><a/>", ParseErrorCode::CDataOutsideRoot),
            ("<a x=\"1\" x=\"2\"/>", ParseErrorCode::DuplicateAttribute),
            (" <?xml version=\"1.0\"?><a/>", ParseErrorCode::MisplacedXmlDecl),
            ("<a/><!DOCTYPE a>", ParseErrorCode::MisplacedDoctype),
            ("<!DOCTYPE a><!DOCTYPE a><a/>", ParseErrorCode::MisplacedDoctype),
        ];
        for (input, code) in cases {
            let err = build(input).expect_err(input);
            assert_eq!(err.code, code, "input {input:?}");
        }
    }

    #[test]
    fn enforces_depth_limit() {
        let depth = 8;
        let input = format!("{}{}", "<d>".repeat(depth + 1), "</d>".repeat(depth + 1));
        let config = ParseConfig { max_depth: depth };
        let err = build_document(tokenize(&input).expect("tokenize"), &config).expect_err("too deep");
        assert_eq!(err.code, ParseErrorCode::DepthLimitExceeded);
        assert_eq!(err.position, depth * 3);

        let ok = format!("{}{}", "<d>".repeat(depth), "</d>".repeat(depth));
        assert!(build_document(tokenize(&ok).expect("tokenize"), &config).is_ok());
    }
}
