use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::formats::EXPECTED_OUTLINE_FORMAT_V1;

/// An `.outline` fixture: `# key: value` headers followed by the expected
/// outline lines. Leading indentation of outline lines is significant.
pub struct ExpectedOutline {
    pub cap: usize,
    pub lines: Vec<String>,
}

pub fn parse_expected_outline(path: &Path) -> ExpectedOutline {
    let content = fs::read_to_string(path)
        .unwrap_or_else(|err| panic!("failed to read expected outline file {path:?}: {err}"));
    let (headers, lines) = parse_headers_and_lines(&content, path, &["format", "cap"]);
    let format = headers.get("format").expect("format header validated");
    assert_eq!(
        format, EXPECTED_OUTLINE_FORMAT_V1,
        "unsupported format in {path:?}"
    );
    assert!(
        !lines.is_empty(),
        "expected outline file {path:?} has no outline lines"
    );
    assert!(
        is_document_root_line(&lines[0]),
        "expected outline file {path:?} must start with #document"
    );

    ExpectedOutline {
        cap: header_usize(&headers, "cap", usize::MAX, path),
        lines,
    }
}

fn parse_headers_and_lines(
    content: &str,
    path: &Path,
    supported_headers: &[&str],
) -> (BTreeMap<String, String>, Vec<String>) {
    let mut lines = Vec::new();
    let mut headers = BTreeMap::<String, String>::new();

    for raw_line in content.lines() {
        let line = raw_line.trim_end();
        if line.is_empty() {
            continue;
        }
        if is_document_root_line(line) || !lines.is_empty() {
            lines.push(line.to_string());
            continue;
        }
        let Some(stripped) = line.strip_prefix('#') else {
            panic!("outline lines must start with #document in {path:?}, found '{line}'");
        };
        let header = stripped.trim();
        let Some((key, value)) = header.split_once(':') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim().to_string();
        assert!(
            supported_headers.contains(&key.as_str()),
            "unsupported header '{key}' in {path:?}"
        );
        if headers.is_empty() {
            assert_eq!(
                key, "format",
                "first header must be 'format' in {path:?}, found '{key}'"
            );
        }
        if headers.insert(key.clone(), value).is_some() {
            panic!("duplicate header '{key}' in {path:?}");
        }
    }

    assert!(
        headers.contains_key("format"),
        "missing required 'format' header in {path:?}"
    );
    (headers, lines)
}

fn header_usize(headers: &BTreeMap<String, String>, key: &str, default: usize, path: &Path) -> usize {
    match headers.get(key) {
        None => default,
        Some(raw) => raw
            .parse()
            .unwrap_or_else(|_| panic!("invalid number '{raw}' for {key} in {path:?}")),
    }
}

fn is_document_root_line(line: &str) -> bool {
    line == "#document" || line.starts_with("#document ")
}
