//! Lossless XML document model with structural merge.
//!
//! Every node keeps the literal tokens it was parsed from, so
//! `flush(&parse(text)?) == text`. On top of that model the crate offers a
//! visitor walker, path and position lookups, a structural comparator and a
//! positional merge that turns one document into another through undoable
//! patches.

pub mod compare;
pub mod config;
pub mod debug;
#[cfg(any(test, feature = "dom-snapshot"))]
pub mod dom_snapshot;
pub mod entities;
pub mod error;
pub mod flush;
pub mod golden_corpus;
pub mod merge;
pub mod namespace;
pub mod path;
pub mod perf_fixtures;
pub mod position;
pub mod traverse;

mod dom_builder;
mod dom_patch;
mod tokenizer;
mod types;

pub use crate::compare::{nodes_equal, tokens_equal};
pub use crate::config::{InsertMode, MergeConfig, ParseConfig};
pub use crate::dom_builder::build_document;
pub use crate::dom_patch::TreePatch;
pub use crate::error::{IdsExhausted, NamespaceError, ParseError, ParseErrorCode, PatchError};
pub use crate::flush::{flush, flush_node};
pub use crate::merge::merge;
pub use crate::path::{find_path, parent_of};
pub use crate::position::{containing_element, containing_node, find_position, node_span};
pub use crate::tokenizer::tokenize;
pub use crate::traverse::{Visitor, find_node, walk_document, walk_element, walk_node};
pub use crate::types::{
    Attribute, Document, Element, Id, IdAllocator, NamespaceDecl, Node, NodeId, NodeRef, Text,
    TextKind, Token, TokenKind, TokenStream,
};

/// Tokenize and build with the default [`ParseConfig`].
pub fn parse(input: &str) -> Result<Document, ParseError> {
    parse_with_config(input, &ParseConfig::default())
}

pub fn parse_with_config(input: &str, config: &ParseConfig) -> Result<Document, ParseError> {
    let stream = tokenize(input)?;
    build_document(stream, config)
}
