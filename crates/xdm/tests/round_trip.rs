use std::fs;
use std::path::{Path, PathBuf};
use xdm::debug::outline;
use xdm::golden_corpus::fixtures;
use xdm::namespace::rename_prefix;
use xdm::{ParseErrorCode, find_position, flush, parse};
use xdm_test_support::expected_outline::parse_expected_outline;
use xdm_test_support::{diff_lines, escape_text};

fn outline_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("outline")
}

#[test]
fn golden_inputs_flush_byte_for_byte() {
    for fixture in fixtures() {
        let doc = parse(fixture.input)
            .unwrap_or_else(|err| panic!("{}: {err}", fixture.name));
        let text = flush(&doc);
        assert_eq!(
            text,
            fixture.input,
            "{}: \"{}\"",
            fixture.name,
            escape_text(&text)
        );
    }
}

#[test]
fn outline_fixtures_match() {
    let mut checked = 0;
    let entries = fs::read_dir(outline_dir()).expect("outline fixture dir");
    for entry in entries {
        let path = entry.expect("dir entry").path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("outline") {
            continue;
        }
        let expected = parse_expected_outline(&path);
        let source_path = path.with_extension("xml");
        let source = fs::read_to_string(&source_path)
            .unwrap_or_else(|err| panic!("failed to read {source_path:?}: {err}"));
        let doc = parse(&source).unwrap_or_else(|err| panic!("{source_path:?}: {err}"));
        assert_eq!(flush(&doc), source);

        let actual = outline(&doc, expected.cap);
        assert!(
            actual == expected.lines,
            "{path:?}\n{}",
            diff_lines(&expected.lines, &actual)
        );
        checked += 1;
    }
    assert!(checked > 0, "no outline fixtures found");
}

#[test]
fn parse_errors_report_line_and_column() {
    let cases = [
        ("<a>\n  <b>\n</a>", ParseErrorCode::MismatchedEndTag, "3:1"),
        ("<a>\n  <!-- open", ParseErrorCode::UnterminatedComment, "2:3"),
        ("<a/>\n<b/>", ParseErrorCode::MultipleRootElements, "2:1"),
        ("<a x=\"1\" x=\"2\"/>", ParseErrorCode::DuplicateAttribute, "1:10"),
    ];
    for (source, code, position) in cases {
        let err = parse(source).expect_err(source);
        assert_eq!(err.code, code, "{source:?}");
        assert_eq!(err.line_col(source).to_string(), position, "{source:?}");
    }
}

#[test]
fn prefix_rename_only_touches_prefixes() {
    let source = "<?xml version=\"1.0\"?>\n<x:doc xmlns:x=\"urn:x\">\n  <x:p x:lang=\"en\">Hi</x:p>\n</x:doc>\n";
    let mut doc = parse(source).expect("parse");
    let root = doc.root_element().expect("root").id();
    let before = find_position(&doc, root);

    let renamed = rename_prefix(&mut doc, root, "x", "y").expect("rename");
    assert_eq!(renamed, 3);
    assert_eq!(flush(&doc), source.replace("x:", "y:").replace("xmlns:x", "xmlns:y"));
    assert_eq!(find_position(&doc, root), before);
}
