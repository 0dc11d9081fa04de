//! Byte offset <-> line/column mapping for UTF-8 text.
//!
//! Lines are split on `\n` only (a `\r\n` pair keeps its `\r` on the line it
//! terminates). Lines and columns are zero-based; columns count Unicode scalar
//! values, not bytes.

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LineCol {
    pub line: usize,
    pub column: usize,
}

impl std::fmt::Display for LineCol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Human-facing output is one-based.
        write!(f, "{}:{}", self.line + 1, self.column + 1)
    }
}

#[derive(Clone, Debug)]
pub struct LineIndex<'a> {
    text: &'a str,
    // Byte offset of the first byte of every line. Always starts with 0.
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub fn new(text: &'a str) -> Self {
        let mut line_starts = Vec::with_capacity(text.len() / 32 + 1);
        line_starts.push(0);
        line_starts.extend(
            text.bytes()
                .enumerate()
                .filter(|&(_, b)| b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self { text, line_starts }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Map a byte offset to a line/column pair.
    ///
    /// Offsets past the end clamp to the end of the text. Offsets that fall inside
    /// a multi-byte character resolve to that character's column.
    pub fn line_col(&self, offset: usize) -> LineCol {
        let offset = offset.min(self.text.len());
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        let start = self.line_starts[line];
        let column = self.text[start..]
            .char_indices()
            .take_while(|&(i, _)| start + i < offset)
            .filter(|&(i, ch)| start + i + ch.len_utf8() <= offset)
            .count();
        LineCol { line, column }
    }

    /// Map a line/column pair back to a byte offset.
    ///
    /// Returns `None` when the line does not exist or the column lies beyond the
    /// end of the line (the position just past the last character is valid).
    pub fn offset(&self, pos: LineCol) -> Option<usize> {
        let start = *self.line_starts.get(pos.line)?;
        let end = self
            .line_starts
            .get(pos.line + 1)
            .map(|next| next - 1)
            .unwrap_or(self.text.len());
        let line = &self.text[start..end];
        if pos.column == 0 {
            return Some(start);
        }
        let mut chars = line.char_indices();
        match chars.nth(pos.column) {
            Some((i, _)) => Some(start + i),
            None if line.chars().count() == pos.column => Some(end),
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_offsets_on_multiple_lines() {
        let index = LineIndex::new("<a>\n  <b/>\n</a>");
        assert_eq!(index.line_count(), 3);
        assert_eq!(index.line_col(0), LineCol { line: 0, column: 0 });
        assert_eq!(index.line_col(4), LineCol { line: 1, column: 0 });
        assert_eq!(index.line_col(6), LineCol { line: 1, column: 2 });
        assert_eq!(index.line_col(11), LineCol { line: 2, column: 0 });
    }

    #[test]
    fn columns_count_chars_not_bytes() {
        let text = "<é a=\"ö\"/>";
        let index = LineIndex::new(text);
        let offset = text.find('a').unwrap();
        assert_eq!(index.line_col(offset), LineCol { line: 0, column: 3 });
        assert_eq!(index.offset(LineCol { line: 0, column: 3 }), Some(offset));
    }

    #[test]
    fn offset_round_trips_through_line_col() {
        let text = "one\ntwo\n\nfour";
        let index = LineIndex::new(text);
        for offset in 0..=text.len() {
            let pos = index.line_col(offset);
            assert_eq!(index.offset(pos), Some(offset), "offset {offset} via {pos:?}");
        }
    }

    #[test]
    fn rejects_positions_outside_the_text() {
        let index = LineIndex::new("ab\ncd");
        assert_eq!(index.offset(LineCol { line: 0, column: 2 }), Some(2));
        assert_eq!(index.offset(LineCol { line: 0, column: 3 }), None);
        assert_eq!(index.offset(LineCol { line: 2, column: 0 }), None);
        assert_eq!(index.line_col(100), LineCol { line: 1, column: 2 });
    }

    #[test]
    fn display_is_one_based() {
        assert_eq!(LineCol { line: 0, column: 4 }.to_string(), "1:5");
    }
}
