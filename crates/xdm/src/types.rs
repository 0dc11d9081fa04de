//! Token-annotated XML node model.
//!
//! Every node keeps, next to its semantic value, the literal tokens it was
//! parsed from. Concatenating the tokens of every node in flush order gives back
//! the exact source text (see `flush`).
//!
//! Ownership: a `Document` owns its children, an `Element` owns its attributes
//! and children. Identity (`Id`) is handed out by the document's `IdAllocator`;
//! there is no process-wide counter.

use crate::entities::{decode_entities, escape_attribute_value, escape_text};
use crate::error::IdsExhausted;
use std::borrow::Cow;
use std::fmt;

pub type NodeId = u32;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id(pub NodeId);

impl Id {
    /// Identity of a node that has not been inserted into a document yet.
    pub const UNASSIGNED: Id = Id(0);

    pub fn is_assigned(self) -> bool {
        self != Self::UNASSIGNED
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Per-document identity source. Ids increase monotonically and are never
/// reused; once `u32::MAX` has been handed out the allocator stays exhausted.
#[derive(Clone, Debug)]
pub struct IdAllocator {
    next: Option<NodeId>,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdAllocator {
    pub fn new() -> Self {
        Self { next: Some(1) }
    }

    pub fn allocate(&mut self) -> Result<Id, IdsExhausted> {
        let next = self.next.ok_or(IdsExhausted)?;
        self.next = next.checked_add(1);
        Ok(Id(next))
    }

    /// Make sure ids already present in a subtree are never handed out again.
    pub(crate) fn observe(&mut self, id: Id) {
        if let Some(next) = self.next {
            if id.0 >= next {
                self.next = id.0.checked_add(1);
            }
        }
    }

    /// Give every unassigned node of `node` (attributes included) a fresh id.
    pub(crate) fn assign_node(&mut self, node: &mut Node) -> Result<(), IdsExhausted> {
        match node {
            Node::Element(element) => self.assign_element(element),
            Node::Text(text) => self.assign_id(&mut text.id),
        }
    }

    pub(crate) fn assign_attribute(
        &mut self,
        attribute: &mut Attribute,
    ) -> Result<(), IdsExhausted> {
        self.assign_id(&mut attribute.id)
    }

    fn assign_element(&mut self, element: &mut Element) -> Result<(), IdsExhausted> {
        self.assign_id(&mut element.id)?;
        for attribute in &mut element.attributes {
            self.assign_id(&mut attribute.id)?;
        }
        for child in &mut element.children {
            self.assign_node(child)?;
        }
        Ok(())
    }

    fn assign_id(&mut self, id: &mut Id) -> Result<(), IdsExhausted> {
        // only assign if currently unset
        if id.is_assigned() {
            self.observe(*id);
        } else {
            *id = self.allocate()?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    XmlDecl,
    Doctype,
    StartTag,
    TagClose,
    EmptyTagClose,
    EndTag,
    AttributeName,
    AttributeEquals,
    AttributeValue,
    Whitespace,
    Text,
    CDataStart,
    CDataBody,
    CDataEnd,
    CommentStart,
    CommentBody,
    CommentEnd,
    ProcessingInstruction,
}

impl TokenKind {
    pub fn label(self) -> &'static str {
        match self {
            TokenKind::XmlDecl => "xml-decl",
            TokenKind::Doctype => "doctype",
            TokenKind::StartTag => "start-tag",
            TokenKind::TagClose => "tag-close",
            TokenKind::EmptyTagClose => "empty-tag-close",
            TokenKind::EndTag => "end-tag",
            TokenKind::AttributeName => "attr-name",
            TokenKind::AttributeEquals => "attr-equals",
            TokenKind::AttributeValue => "attr-value",
            TokenKind::Whitespace => "whitespace",
            TokenKind::Text => "text",
            TokenKind::CDataStart => "cdata-start",
            TokenKind::CDataBody => "cdata-body",
            TokenKind::CDataEnd => "cdata-end",
            TokenKind::CommentStart => "comment-start",
            TokenKind::CommentBody => "comment-body",
            TokenKind::CommentEnd => "comment-end",
            TokenKind::ProcessingInstruction => "pi",
        }
    }

    /// Kinds whose literal is character content rather than markup.
    pub fn is_content(self) -> bool {
        matches!(
            self,
            TokenKind::Text | TokenKind::CDataBody | TokenKind::CommentBody
        )
    }
}

/// A literal lexical fragment.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Flat token output of the tokenizer, before tree building.
#[derive(Clone, Debug, Default)]
pub struct TokenStream {
    tokens: Vec<(Token, usize)>,
    source_len: usize,
}

impl TokenStream {
    pub(crate) fn new(tokens: Vec<(Token, usize)>, source_len: usize) -> Self {
        Self { tokens, source_len }
    }

    /// Byte length of the tokenized source; end-of-input errors point here.
    pub fn source_len(&self) -> usize {
        self.source_len
    }

    /// Tokens paired with the byte offset where each one starts.
    pub fn tokens(&self) -> &[(Token, usize)] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub(crate) fn into_tokens(self) -> Vec<(Token, usize)> {
        self.tokens
    }
}

/// Index boundaries inside an element's own token list.
///
/// `[..content_start]` is the open tag (the start tag token comes first, attributes
/// are flushed right after it) plus leading content whitespace; children go between
/// `content_start` and the end tag; `[close_end..]` is trailing whitespace owned by
/// the element but outside its interval.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct ElementLayout {
    pub open_end: usize,
    pub content_start: usize,
    pub close_end: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Element {
    pub(crate) id: Id,
    pub(crate) prefix: Option<String>,
    pub(crate) local_name: String,
    pub(crate) attributes: Vec<Attribute>,
    pub(crate) tokens: Vec<Token>,
    pub(crate) children: Vec<Node>,
}

impl Element {
    /// A fresh, unattached, self-closing element (`<name/>`).
    pub fn new(qualified_name: &str) -> Self {
        let (prefix, local_name) = split_qname(qualified_name);
        Self {
            id: Id::UNASSIGNED,
            prefix: prefix.map(str::to_string),
            local_name: local_name.to_string(),
            attributes: Vec::new(),
            tokens: vec![
                Token::new(TokenKind::StartTag, format!("<{qualified_name}")),
                Token::new(TokenKind::EmptyTagClose, "/>"),
            ],
            children: Vec::new(),
        }
    }

    pub(crate) fn from_parts(qualified_name: &str, tokens: Vec<Token>) -> Self {
        let (prefix, local_name) = split_qname(qualified_name);
        Self {
            id: Id::UNASSIGNED,
            prefix: prefix.map(str::to_string),
            local_name: local_name.to_string(),
            attributes: Vec::new(),
            tokens,
            children: Vec::new(),
        }
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    pub fn qualified_name(&self) -> Cow<'_, str> {
        match &self.prefix {
            Some(prefix) => Cow::Owned(format!("{prefix}:{}", self.local_name)),
            None => Cow::Borrowed(&self.local_name),
        }
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|attr| attr.name == name)
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn is_self_closing(&self) -> bool {
        let layout = self.layout();
        layout.open_end > 0 && self.tokens[layout.open_end - 1].kind == TokenKind::EmptyTagClose
    }

    /// Decoded character data of all descendant text and CDATA nodes;
    /// comments and processing instructions are skipped.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }

    /// Same name and tokens, no attributes, no children, unassigned identity.
    pub fn shallow_clone(&self) -> Element {
        Element {
            id: Id::UNASSIGNED,
            prefix: self.prefix.clone(),
            local_name: self.local_name.clone(),
            attributes: Vec::new(),
            tokens: self.tokens.clone(),
            children: Vec::new(),
        }
    }

    /// Complete copy of the subtree with every identity unassigned.
    pub fn deep_clone(&self) -> Element {
        Element {
            id: Id::UNASSIGNED,
            prefix: self.prefix.clone(),
            local_name: self.local_name.clone(),
            attributes: self.attributes.iter().map(Attribute::detached_clone).collect(),
            tokens: self.tokens.clone(),
            children: self.children.iter().map(Node::deep_clone).collect(),
        }
    }

    pub(crate) fn layout(&self) -> ElementLayout {
        let tokens = &self.tokens;
        let open_end = tokens
            .iter()
            .position(|t| matches!(t.kind, TokenKind::TagClose | TokenKind::EmptyTagClose))
            .map(|i| i + 1)
            .unwrap_or(tokens.len());
        if open_end == 0 || tokens[open_end - 1].kind != TokenKind::TagClose {
            return ElementLayout {
                open_end,
                content_start: open_end,
                close_end: open_end,
            };
        }
        let content_start = open_end
            + tokens[open_end..]
                .iter()
                .take_while(|t| t.kind == TokenKind::Whitespace)
                .count();
        let close_end = tokens[content_start..]
            .iter()
            .position(|t| t.kind == TokenKind::EndTag)
            .and_then(|end_tag| {
                let end_tag = content_start + end_tag;
                tokens[end_tag..]
                    .iter()
                    .position(|t| t.kind == TokenKind::TagClose)
                    .map(|close| end_tag + close + 1)
            })
            .unwrap_or(content_start);
        ElementLayout {
            open_end,
            content_start,
            close_end,
        }
    }

    pub(crate) fn push_trailing(&mut self, token: Token) {
        self.tokens.push(token);
    }
}

fn collect_text(children: &[Node], out: &mut String) {
    for child in children {
        match child {
            Node::Text(text) => match text.kind() {
                TextKind::Plain => out.push_str(&text.decoded_text()),
                TextKind::CData => out.push_str(&text.text()),
                TextKind::Comment | TextKind::ProcessingInstruction => {}
            },
            Node::Element(element) => collect_text(&element.children, out),
        }
    }
}

/// A namespace declaration carried by an `xmlns` / `xmlns:*` attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NamespaceDecl<'a> {
    /// `None` for the default namespace (`xmlns="…"`).
    pub prefix: Option<&'a str>,
    pub uri: &'a str,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attribute {
    pub(crate) id: Id,
    pub(crate) name: String,
    pub(crate) value: String,
    pub(crate) tokens: Vec<Token>,
}

impl Attribute {
    /// A fresh, unattached attribute written as ` name="value"`.
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            id: Id::UNASSIGNED,
            name: name.to_string(),
            value: value.to_string(),
            tokens: vec![
                Token::new(TokenKind::Whitespace, " "),
                Token::new(TokenKind::AttributeName, name),
                Token::new(TokenKind::AttributeEquals, "="),
                Token::new(
                    TokenKind::AttributeValue,
                    format!("\"{}\"", escape_attribute_value(value)),
                ),
            ],
        }
    }

    pub(crate) fn from_parts(name: String, value: String, tokens: Vec<Token>) -> Self {
        Self {
            id: Id::UNASSIGNED,
            name,
            value,
            tokens,
        }
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn prefix(&self) -> Option<&str> {
        split_qname(&self.name).0
    }

    pub fn local_name(&self) -> &str {
        split_qname(&self.name).1
    }

    /// Entity-decoded value.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Value literal as written, quotes included.
    pub fn raw_value(&self) -> Option<&str> {
        self.tokens
            .iter()
            .find(|t| t.kind == TokenKind::AttributeValue)
            .map(|t| t.text.as_str())
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn namespace_declaration(&self) -> Option<NamespaceDecl<'_>> {
        if self.name == "xmlns" {
            return Some(NamespaceDecl {
                prefix: None,
                uri: &self.value,
            });
        }
        self.name.strip_prefix("xmlns:").map(|prefix| NamespaceDecl {
            prefix: Some(prefix),
            uri: &self.value,
        })
    }

    pub fn is_namespace_declaration(&self) -> bool {
        self.namespace_declaration().is_some()
    }

    /// Copy with an unassigned identity.
    pub fn detached_clone(&self) -> Attribute {
        Attribute {
            id: Id::UNASSIGNED,
            ..self.clone()
        }
    }

    /// Number of leading whitespace tokens (the separator before the name).
    pub(crate) fn leading_len(&self) -> usize {
        self.tokens
            .iter()
            .take_while(|t| t.kind == TokenKind::Whitespace)
            .count()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextKind {
    Plain,
    CData,
    Comment,
    ProcessingInstruction,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Text {
    pub(crate) id: Id,
    pub(crate) tokens: Vec<Token>,
}

impl Text {
    /// A fresh, unattached character data node; `text` is escaped.
    pub fn new(text: &str) -> Self {
        Self {
            id: Id::UNASSIGNED,
            tokens: vec![Token::new(TokenKind::Text, escape_text(text))],
        }
    }

    /// A fresh, unattached comment node (`<!--text-->`).
    pub fn comment(text: &str) -> Self {
        Self {
            id: Id::UNASSIGNED,
            tokens: vec![
                Token::new(TokenKind::CommentStart, "<!--"),
                Token::new(TokenKind::CommentBody, text),
                Token::new(TokenKind::CommentEnd, "-->"),
            ],
        }
    }

    pub(crate) fn from_tokens(tokens: Vec<Token>) -> Self {
        Self {
            id: Id::UNASSIGNED,
            tokens,
        }
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn kind(&self) -> TextKind {
        match self.tokens.first().map(|t| t.kind) {
            Some(TokenKind::CDataStart) => TextKind::CData,
            Some(TokenKind::CommentStart) => TextKind::Comment,
            Some(TokenKind::ProcessingInstruction) => TextKind::ProcessingInstruction,
            _ => TextKind::Plain,
        }
    }

    /// Literal character content: the non-markup tokens, concatenated.
    pub fn text(&self) -> Cow<'_, str> {
        let mut content = self.tokens[..self.content_end()]
            .iter()
            .filter(|t| t.kind.is_content());
        let Some(first) = content.next() else {
            return Cow::Borrowed("");
        };
        match content.next() {
            None => Cow::Borrowed(first.text.as_str()),
            Some(second) => {
                let mut out = String::with_capacity(first.len() + second.len());
                out.push_str(&first.text);
                out.push_str(&second.text);
                for token in content {
                    out.push_str(&token.text);
                }
                Cow::Owned(out)
            }
        }
    }

    /// Character content with entity references resolved (plain text only;
    /// CDATA and comments are never entity-decoded).
    pub fn decoded_text(&self) -> Cow<'_, str> {
        match self.kind() {
            TextKind::Plain => Cow::Owned(decode_entities(&self.text())),
            _ => self.text(),
        }
    }

    pub fn detached_clone(&self) -> Text {
        Text {
            id: Id::UNASSIGNED,
            tokens: self.tokens.clone(),
        }
    }

    /// Index just past the node's own content; anything after it is trailing
    /// whitespace (or a misplaced prolog token) owned but not covered by the node.
    pub(crate) fn content_end(&self) -> usize {
        self.tokens
            .iter()
            .position(|t| {
                matches!(
                    t.kind,
                    TokenKind::Text
                        | TokenKind::ProcessingInstruction
                        | TokenKind::CDataEnd
                        | TokenKind::CommentEnd
                )
            })
            .map(|i| i + 1)
            .unwrap_or(self.tokens.len())
    }

    pub(crate) fn push_trailing(&mut self, token: Token) {
        self.tokens.push(token);
    }
}

/// Owned child of a document or element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(Text),
}

impl Node {
    pub fn id(&self) -> Id {
        match self {
            Node::Element(element) => element.id,
            Node::Text(text) => text.id,
        }
    }

    pub fn tokens(&self) -> &[Token] {
        match self {
            Node::Element(element) => &element.tokens,
            Node::Text(text) => &text.tokens,
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&Text> {
        match self {
            Node::Text(text) => Some(text),
            Node::Element(_) => None,
        }
    }

    pub fn to_ref(&self) -> NodeRef<'_> {
        NodeRef::from(self)
    }

    /// Shell copy used as an insertion placeholder: elements lose attributes and
    /// children, text keeps everything. Identity is unassigned.
    pub fn shallow_clone(&self) -> Node {
        match self {
            Node::Element(element) => Node::Element(element.shallow_clone()),
            Node::Text(text) => Node::Text(text.detached_clone()),
        }
    }

    pub fn deep_clone(&self) -> Node {
        match self {
            Node::Element(element) => Node::Element(element.deep_clone()),
            Node::Text(text) => Node::Text(text.detached_clone()),
        }
    }

    pub(crate) fn push_trailing(&mut self, token: Token) {
        match self {
            Node::Element(element) => element.push_trailing(token),
            Node::Text(text) => text.push_trailing(token),
        }
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

impl From<Text> for Node {
    fn from(text: Text) -> Self {
        Node::Text(text)
    }
}

/// Root container: prolog tokens plus exactly one root element (and any
/// comments/processing instructions around it).
#[derive(Clone, Debug)]
pub struct Document {
    pub(crate) id: Id,
    pub(crate) tokens: Vec<Token>,
    pub(crate) children: Vec<Node>,
    pub(crate) ids: IdAllocator,
}

impl Document {
    pub(crate) fn from_parts(
        id: Id,
        tokens: Vec<Token>,
        children: Vec<Node>,
        ids: IdAllocator,
    ) -> Self {
        Self {
            id,
            tokens,
            children,
            ids,
        }
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn root_element(&self) -> Option<&Element> {
        self.children.iter().find_map(Node::as_element)
    }

    pub fn as_node_ref(&self) -> NodeRef<'_> {
        NodeRef::Document(self)
    }

    pub(crate) fn root_element_count(&self) -> usize {
        self.children.iter().filter_map(Node::as_element).count()
    }
}

/// Borrowed view over any node kind. Walkers and query results hand these out.
#[derive(Clone, Copy, Debug)]
pub enum NodeRef<'a> {
    Document(&'a Document),
    Element(&'a Element),
    Attribute(&'a Attribute),
    Text(&'a Text),
}

impl<'a> NodeRef<'a> {
    pub fn id(self) -> Id {
        match self {
            NodeRef::Document(document) => document.id,
            NodeRef::Element(element) => element.id,
            NodeRef::Attribute(attribute) => attribute.id,
            NodeRef::Text(text) => text.id,
        }
    }

    pub fn tokens(self) -> &'a [Token] {
        match self {
            NodeRef::Document(document) => &document.tokens,
            NodeRef::Element(element) => &element.tokens,
            NodeRef::Attribute(attribute) => &attribute.tokens,
            NodeRef::Text(text) => &text.tokens,
        }
    }

    pub fn kind_label(self) -> &'static str {
        match self {
            NodeRef::Document(_) => "document",
            NodeRef::Element(_) => "element",
            NodeRef::Attribute(_) => "attribute",
            NodeRef::Text(text) => match text.kind() {
                TextKind::Plain => "text",
                TextKind::CData => "cdata",
                TextKind::Comment => "comment",
                TextKind::ProcessingInstruction => "pi",
            },
        }
    }

    /// Ordered child nodes (attributes are not children).
    pub fn children(self) -> &'a [Node] {
        match self {
            NodeRef::Document(document) => &document.children,
            NodeRef::Element(element) => &element.children,
            NodeRef::Attribute(_) | NodeRef::Text(_) => &[],
        }
    }

    pub fn attributes(self) -> &'a [Attribute] {
        match self {
            NodeRef::Element(element) => &element.attributes,
            _ => &[],
        }
    }

    pub fn as_element(self) -> Option<&'a Element> {
        match self {
            NodeRef::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn is_same(self, other: NodeRef<'_>) -> bool {
        self.id() == other.id()
    }
}

impl<'a> From<&'a Node> for NodeRef<'a> {
    fn from(node: &'a Node) -> Self {
        match node {
            Node::Element(element) => NodeRef::Element(element),
            Node::Text(text) => NodeRef::Text(text),
        }
    }
}

impl fmt::Display for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRef::Document(document) => write!(f, "document {}", document.id),
            NodeRef::Element(element) => {
                write!(f, "element <{}> {}", element.qualified_name(), element.id)
            }
            NodeRef::Attribute(attribute) => write!(
                f,
                "attribute {}={:?} {}",
                attribute.name, attribute.value, attribute.id
            ),
            NodeRef::Text(text) => write!(
                f,
                "{} {:?} {}",
                self.kind_label(),
                preview(&text.text(), 24),
                text.id
            ),
        }
    }
}

pub(crate) fn preview(s: &str, max_chars: usize) -> String {
    let mut out: String = s.chars().take(max_chars).collect();
    if s.chars().nth(max_chars).is_some() {
        out.push('…');
    }
    out
}

pub(crate) fn split_qname(name: &str) -> (Option<&str>, &str) {
    match name.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, name),
    }
}
