//! Structural equality: semantic value plus token shape.
//!
//! Two nodes that carry the same value but differ in formatting (extra
//! whitespace, `<a/>` vs `<a></a>`, quote style) are *not* equal.

use crate::types::{NodeRef, Token};

/// Same number of tokens, and equal kind and literal at every index.
pub fn tokens_equal(a: &[Token], b: &[Token]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.kind == y.kind && x.text == y.text)
}

/// Shallow structural comparison; children are left to the caller.
pub fn nodes_equal(a: NodeRef<'_>, b: NodeRef<'_>) -> bool {
    match (a, b) {
        (NodeRef::Document(_), NodeRef::Document(_)) => true,
        (NodeRef::Element(x), NodeRef::Element(y)) => {
            x.local_name() == y.local_name() && tokens_equal(x.tokens(), y.tokens())
        }
        (NodeRef::Attribute(x), NodeRef::Attribute(y)) => {
            x.name() == y.name() && x.value() == y.value() && tokens_equal(x.tokens(), y.tokens())
        }
        (NodeRef::Text(x), NodeRef::Text(y)) => {
            x.text() == y.text() && tokens_equal(x.tokens(), y.tokens())
        }
        _ => false,
    }
}
