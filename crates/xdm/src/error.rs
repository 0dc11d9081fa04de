//! Error types for parsing, patch application and namespace refactoring.
//!
//! Lookups that simply find nothing return `Option`; these errors are reserved
//! for rejected input and for operations that cannot be carried out.

use crate::types::Id;
use tools::{LineCol, LineIndex};

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParseErrorCode {
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("unexpected character")]
    UnexpectedCharacter,
    #[error("unterminated comment")]
    UnterminatedComment,
    #[error("unterminated CDATA section")]
    UnterminatedCData,
    #[error("unterminated processing instruction")]
    UnterminatedProcessingInstruction,
    #[error("unterminated doctype")]
    UnterminatedDoctype,
    #[error("unterminated attribute value")]
    UnterminatedAttributeValue,
    #[error("invalid name")]
    InvalidName,
    #[error("attribute without value")]
    MissingAttributeValue,
    #[error("duplicate attribute")]
    DuplicateAttribute,
    #[error("end tag does not match the open element")]
    MismatchedEndTag,
    #[error("end tag without open element")]
    UnexpectedEndTag,
    #[error("no root element")]
    MissingRootElement,
    #[error("more than one root element")]
    MultipleRootElements,
    #[error("character data outside the root element")]
    TextOutsideRoot,
    #[error("CDATA section outside the root element")]
    CDataOutsideRoot,
    #[error("XML declaration is only allowed at the very start")]
    MisplacedXmlDecl,
    #[error("doctype is only allowed once, before the root element")]
    MisplacedDoctype,
    #[error("element nesting exceeds the configured depth limit")]
    DepthLimitExceeded,
    #[error("document has more nodes than ids")]
    TooManyNodes,
}

/// Rejected input. `position` is a byte offset into the parsed text.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{code} at byte {position}")]
pub struct ParseError {
    pub code: ParseErrorCode,
    pub position: usize,
}

impl ParseError {
    pub(crate) fn new(code: ParseErrorCode, position: usize) -> Self {
        Self { code, position }
    }

    /// Line/column of the error inside `source` (the text that was parsed).
    pub fn line_col(&self, source: &str) -> LineCol {
        LineIndex::new(source).line_col(self.position)
    }
}

/// Every id of the document's allocator has been handed out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("node ids exhausted")]
pub struct IdsExhausted;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PatchError {
    #[error("node {0} not found")]
    UnknownNode(Id),
    #[error("the document node cannot be deleted")]
    DeleteDocument,
    #[error("node {0} cannot hold children")]
    NotAContainer(Id),
    #[error("node {0} is not an element")]
    NotAnElement(Id),
    #[error("index {index} out of bounds for {parent} with {len} entries")]
    IndexOutOfBounds { parent: Id, index: usize, len: usize },
    #[error("character data cannot be a document child")]
    InvalidDocumentChild,
    #[error("document would end up with {0} root elements")]
    RootElementCount(usize),
    #[error("element {element} would carry attribute `{name}` twice")]
    DuplicateAttribute { element: Id, name: String },
    #[error(transparent)]
    IdsExhausted(#[from] IdsExhausted),
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum NamespaceError {
    #[error("element {0} not found")]
    UnknownElement(Id),
    #[error("prefix `{prefix}` is not declared on {element}")]
    UndeclaredPrefix { element: Id, prefix: String },
    #[error("prefix `{0}` is reserved")]
    ReservedPrefix(String),
    #[error("`{0}` is not a valid namespace prefix")]
    InvalidPrefix(String),
    #[error("prefix `{prefix}` is already declared on {element}")]
    PrefixAlreadyDeclared { element: Id, prefix: String },
    #[error("prefix `{prefix}` is re-declared on {element} inside the renamed scope")]
    PrefixCaptured { element: Id, prefix: String },
}
