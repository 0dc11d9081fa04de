use crate::escape_text;
use xdm::dom_snapshot::{DomSnapshotOptions, compare_dom};
use xdm::{Document, flush, parse};

pub fn parse_ok(text: &str) -> Document {
    parse(text)
        .unwrap_or_else(|err| panic!("failed to parse \"{}\": {err}", escape_text(text)))
}

pub fn parse_all(texts: &[&str]) -> Vec<Document> {
    texts.iter().map(|text| parse_ok(text)).collect()
}

/// Flushed text must reproduce `source` byte for byte.
pub fn assert_round_trip(source: &str) -> Document {
    let doc = parse_ok(source);
    let text = flush(&doc);
    assert!(
        text == source,
        "round trip changed the text:\n  source: \"{}\"\n flushed: \"{}\"",
        escape_text(source),
        escape_text(&text)
    );
    doc
}

/// `actual` must match `expected` in text and, structurally, in tree shape.
pub fn assert_same_document(
    expected: &Document,
    actual: &Document,
    options: DomSnapshotOptions,
) {
    let (left, right) = (flush(expected), flush(actual));
    assert!(
        left == right,
        "flushed text differs:\n  expected: \"{}\"\n    actual: \"{}\"",
        escape_text(&left),
        escape_text(&right)
    );
    if let Err(mismatch) = compare_dom(expected, actual, options) {
        panic!("{mismatch}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_returns_the_parsed_document() {
        let doc = assert_round_trip("<a>\n  <b k='v'/>\n</a>\n");
        assert_eq!(doc.root_element().expect("a").local_name(), "a");
        let again = parse_ok("<a>\n  <b k='v'/>\n</a>\n");
        assert_same_document(&doc, &again, DomSnapshotOptions::default());
    }

    #[test]
    #[should_panic(expected = "flushed text differs")]
    fn different_text_is_reported() {
        let docs = parse_all(&["<a/>", "<a />"]);
        assert_same_document(&docs[0], &docs[1], DomSnapshotOptions::default());
    }
}
