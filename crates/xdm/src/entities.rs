/// XML entity and character reference handling.
///
/// Contract:
/// - Only the five predefined XML entities are decoded: `&amp;`, `&lt;`, `&gt;`,
///   `&quot;`, `&apos;`. There is no DTD support, so other named references stay literal.
/// - Character references decode only when well-formed and semicolon-terminated:
///   `&#123;` (decimal) and `&#x1F4A9;` (hex).
/// - Only valid Unicode scalar values decode; invalid scalars pass through unchanged.
/// - Missing semicolons, unknown names, malformed numerics, or overlong digit runs are left
///   unchanged.
///
/// Tokens always keep the raw literal; decoding only feeds semantic values.
const PREDEFINED: [(&[u8], char); 5] = [
    (b"&amp;", '&'),
    (b"&lt;", '<'),
    (b"&gt;", '>'),
    (b"&quot;", '"'),
    (b"&apos;", '\''),
];

const MAX_HEX_DIGITS: usize = 6; // 0x10FFFF
const MAX_DEC_DIGITS: usize = 7; // 1114111

pub fn decode_entities(s: &str) -> String {
    let bytes = s.as_bytes();
    let Some(first) = memchr::memchr(b'&', bytes) else {
        return s.to_string();
    };
    let mut out = String::with_capacity(s.len());
    let mut i = first;
    let mut copy_start = 0;

    'scan: while i < bytes.len() {
        if bytes[i] != b'&' {
            i += 1;
            continue;
        }

        // Flush bytes up to '&' unchanged (preserves UTF-8).
        if copy_start < i {
            out.push_str(&s[copy_start..i]);
        }

        for (pattern, ch) in PREDEFINED {
            if starts_with_bytes(bytes, i, pattern) {
                out.push(ch);
                i += pattern.len();
                copy_start = i;
                continue 'scan;
            }
        }

        let numeric = if starts_with_bytes(bytes, i, b"&#x") || starts_with_bytes(bytes, i, b"&#X")
        {
            Some((i + 3, MAX_HEX_DIGITS, 16))
        } else if starts_with_bytes(bytes, i, b"&#") {
            Some((i + 2, MAX_DEC_DIGITS, 10))
        } else {
            None
        };

        if let Some((digits_start, max_digits, radix)) = numeric {
            let Some(end) = scan_numeric_reference(bytes, digits_start, max_digits, radix == 16)
            else {
                i = emit_malformed_reference(&mut out, s, bytes, i);
                copy_start = i;
                continue;
            };
            match u32::from_str_radix(&s[digits_start..end], radix)
                .ok()
                .and_then(char::from_u32)
            {
                Some(ch) => out.push(ch),
                // Known end; preserve entire sequence unchanged.
                None => out.push_str(&s[i..=end]),
            }
            i = end + 1;
            copy_start = i;
            continue;
        }

        // fallback to keep '&' as-is
        out.push('&');
        i += 1;
        copy_start = i;
    }

    if copy_start < bytes.len() {
        out.push_str(&s[copy_start..]);
    }

    out
}

/// Escape character data so it can be stored in a `Text` token.
pub fn escape_text(s: &str) -> String {
    escape_with(s, |ch| match ch {
        '&' => Some("&amp;"),
        '<' => Some("&lt;"),
        '>' => Some("&gt;"),
        _ => None,
    })
}

/// Escape an attribute value for a double-quoted `AttributeValue` token.
pub fn escape_attribute_value(s: &str) -> String {
    escape_with(s, |ch| match ch {
        '&' => Some("&amp;"),
        '<' => Some("&lt;"),
        '"' => Some("&quot;"),
        _ => None,
    })
}

fn escape_with(s: &str, replacement: impl Fn(char) -> Option<&'static str>) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match replacement(ch) {
            Some(entity) => out.push_str(entity),
            None => out.push(ch),
        }
    }
    out
}

// Bounded scan to avoid quadratic behavior on adversarial input.
fn scan_numeric_reference(
    bytes: &[u8],
    start: usize,
    max_digits: usize,
    is_hex: bool,
) -> Option<usize> {
    let mut j = start;
    let mut digits = 0usize;

    while j < bytes.len() {
        let b = bytes[j];
        if b == b';' {
            return (digits > 0).then_some(j);
        }
        if digits == max_digits {
            return None;
        }
        let ok = if is_hex {
            b.is_ascii_hexdigit()
        } else {
            b.is_ascii_digit()
        };
        if !ok {
            return None;
        }
        digits += 1;
        j += 1;
    }

    None
}

fn emit_malformed_reference(out: &mut String, s: &str, bytes: &[u8], start: usize) -> usize {
    let mut j = start + 1;
    while j < bytes.len() {
        let b = bytes[j];
        // Stop at `;`, whitespace, or `&` to avoid spanning into adjacent references.
        if b == b';' {
            out.push_str(&s[start..=j]);
            return j + 1;
        }
        if b == b'&' || b.is_ascii_whitespace() {
            out.push_str(&s[start..j]);
            return j;
        }
        j += 1;
    }
    out.push_str(&s[start..]);
    bytes.len()
}

fn starts_with_bytes(bytes: &[u8], i: usize, pat: &[u8]) -> bool {
    bytes.get(i..i + pat.len()).is_some_and(|s| s == pat)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_utf8() {
        assert_eq!(decode_entities("120×32"), "120×32");
        assert_eq!(decode_entities("π &amp; σ"), "π & σ");
    }

    #[test]
    fn decodes_predefined_entities() {
        assert_eq!(decode_entities("a &amp; b"), "a & b");
        assert_eq!(decode_entities("&lt;tag&gt;"), "<tag>");
        assert_eq!(decode_entities("&quot;hi&quot;"), "\"hi\"");
        assert_eq!(decode_entities("&apos;x&apos;"), "'x'");
    }

    #[test]
    fn html_only_entities_stay_literal() {
        assert_eq!(decode_entities("a&nbsp;b"), "a&nbsp;b");
        assert_eq!(decode_entities("&copy;"), "&copy;");
    }

    #[test]
    fn decodes_character_references() {
        assert_eq!(decode_entities("&#215;"), "×");
        assert_eq!(decode_entities("&#xD7;"), "×");
        assert_eq!(decode_entities("&#XD7;"), "×");
        assert_eq!(decode_entities("&#1114111;"), "\u{10FFFF}");
    }

    #[test]
    fn malformed_references_pass_through() {
        assert_eq!(decode_entities("&amp"), "&amp");
        assert_eq!(decode_entities("&#xD7 "), "&#xD7 ");
        assert_eq!(decode_entities("&#xZZ;"), "&#xZZ;");
        assert_eq!(decode_entities("&#xD800;"), "&#xD800;");
        assert_eq!(decode_entities("&#x110000;"), "&#x110000;");
        assert_eq!(decode_entities("&#11141111;"), "&#11141111;");
        assert_eq!(decode_entities("&#;"), "&#;");
        assert_eq!(decode_entities("&#xZZ;&amp;"), "&#xZZ;&");
    }

    #[test]
    fn decoding_is_idempotent_on_decoded_output() {
        let samples = ["&", "&&", "&;", "&unknown;", "&amp;&lt;&gt;&quot;&apos;", "&#9999999;"];
        for s in samples {
            let out = decode_entities(s);
            assert!(out.len() <= s.len());
            assert_eq!(decode_entities(&out), out);
        }
    }

    #[test]
    fn escaping_round_trips_through_decoding() {
        let raw = "a < b && \"c\" > 'd'";
        assert_eq!(decode_entities(&escape_text(raw)), raw);
        assert_eq!(decode_entities(&escape_attribute_value(raw)), raw);
        assert_eq!(escape_attribute_value("say \"hi\""), "say &quot;hi&quot;");
        assert_eq!(escape_text("1 < 2"), "1 &lt; 2");
    }
}
