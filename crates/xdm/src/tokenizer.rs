//! Lossless XML tokenizer.
//!
//! Splits the input into literal tokens without dropping a single byte: the
//! concatenation of every token text equals the input. Names accept ASCII
//! `[A-Za-z0-9:_.-]` plus any non-ASCII character, which keeps every slice
//! endpoint on a UTF-8 boundary (we only cut at ASCII bytes).
//!
//! Known limitations (intentional):
//! - No DTD processing; the internal subset is kept verbatim inside the doctype token.
//! - Entity references are not validated here; decoding happens on semantic values.
use crate::error::{ParseError, ParseErrorCode};
use crate::types::{Token, TokenKind, TokenStream};
use memchr::{memchr, memchr2, memmem};

const COMMENT_START: &str = "<!--";
const COMMENT_END: &str = "-->";
const CDATA_START: &str = "<![CDATA[";
const CDATA_END: &str = "]]>";
const PI_START: &str = "<?";
const PI_END: &str = "?>";
const DOCTYPE_START: &[u8] = b"<!DOCTYPE";

fn is_xml_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n')
}

fn is_name_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b':' || b >= 0x80
}

fn is_name_char(b: u8) -> bool {
    is_name_start(b) || b.is_ascii_digit() || b == b'-' || b == b'.'
}

/// Name without a colon, as used for namespace prefixes.
pub(crate) fn is_ncname(s: &str) -> bool {
    let bytes = s.as_bytes();
    match bytes.split_first() {
        Some((&first, rest)) => {
            first != b':' && is_name_start(first) && rest.iter().all(|&b| b != b':' && is_name_char(b))
        }
        None => false,
    }
}

/// Tokenize `input` into a lossless token stream.
pub fn tokenize(input: &str) -> Result<TokenStream, ParseError> {
    let mut tokenizer = Tokenizer::new(input);
    tokenizer.run()?;
    log::debug!(
        target: "xdm.tokenizer",
        "tokenized {} bytes into {} tokens",
        input.len(),
        tokenizer.out.len()
    );
    Ok(TokenStream::new(tokenizer.out, input.len()))
}

struct Tokenizer<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
    out: Vec<(Token, usize)>,
}

impl<'a> Tokenizer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            pos: 0,
            out: Vec::new(),
        }
    }

    fn run(&mut self) -> Result<(), ParseError> {
        while self.pos < self.bytes.len() {
            if self.bytes[self.pos] != b'<' {
                self.char_data();
                continue;
            }
            let rest = &self.input[self.pos..];
            if rest.starts_with(COMMENT_START) {
                self.delimited(
                    (TokenKind::CommentStart, COMMENT_START),
                    TokenKind::CommentBody,
                    (TokenKind::CommentEnd, COMMENT_END),
                    ParseErrorCode::UnterminatedComment,
                )?;
            } else if rest.starts_with(CDATA_START) {
                self.delimited(
                    (TokenKind::CDataStart, CDATA_START),
                    TokenKind::CDataBody,
                    (TokenKind::CDataEnd, CDATA_END),
                    ParseErrorCode::UnterminatedCData,
                )?;
            } else if rest.as_bytes().starts_with(DOCTYPE_START) {
                self.doctype()?;
            } else if rest.starts_with(PI_START) {
                self.processing_instruction()?;
            } else if rest.starts_with("</") {
                self.end_tag()?;
            } else {
                self.start_tag()?;
            }
        }
        Ok(())
    }

    fn emit(&mut self, kind: TokenKind, start: usize, end: usize) {
        debug_assert!(self.input.is_char_boundary(start));
        debug_assert!(self.input.is_char_boundary(end));
        log::trace!(target: "xdm.tokenizer", "emit {} at {start}..{end}", kind.label());
        self.out
            .push((Token::new(kind, &self.input[start..end]), start));
        self.pos = end;
    }

    fn error(&self, code: ParseErrorCode, position: usize) -> ParseError {
        ParseError::new(code, position)
    }

    fn char_data(&mut self) {
        let start = self.pos;
        let end = memchr(b'<', &self.bytes[start..])
            .map(|rel| start + rel)
            .unwrap_or(self.bytes.len());
        let kind = if self.bytes[start..end].iter().all(|&b| is_xml_whitespace(b)) {
            TokenKind::Whitespace
        } else {
            TokenKind::Text
        };
        self.emit(kind, start, end);
    }

    fn whitespace(&mut self) -> bool {
        let start = self.pos;
        let mut end = start;
        while end < self.bytes.len() && is_xml_whitespace(self.bytes[end]) {
            end += 1;
        }
        if end > start {
            self.emit(TokenKind::Whitespace, start, end);
            true
        } else {
            false
        }
    }

    fn scan_name(&self, start: usize) -> Result<usize, ParseError> {
        if start >= self.bytes.len() {
            return Err(self.error(ParseErrorCode::UnexpectedEof, start));
        }
        if !is_name_start(self.bytes[start]) {
            return Err(self.error(ParseErrorCode::InvalidName, start));
        }
        let mut end = start + 1;
        while end < self.bytes.len() && is_name_char(self.bytes[end]) {
            end += 1;
        }
        Ok(end)
    }

    fn delimited(
        &mut self,
        open: (TokenKind, &str),
        body: TokenKind,
        close: (TokenKind, &str),
        unterminated: ParseErrorCode,
    ) -> Result<(), ParseError> {
        let start = self.pos;
        let body_start = start + open.1.len();
        // Scan for the terminator once (linear in body length).
        let Some(rel) = memmem::find(&self.bytes[body_start..], close.1.as_bytes()) else {
            return Err(self.error(unterminated, start));
        };
        let body_end = body_start + rel;
        self.emit(open.0, start, body_start);
        if body_end > body_start {
            self.emit(body, body_start, body_end);
        }
        self.emit(close.0, body_end, body_end + close.1.len());
        Ok(())
    }

    fn processing_instruction(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        let target_end = self.scan_name(start + PI_START.len())?;
        let Some(rel) = memmem::find(&self.bytes[target_end..], PI_END.as_bytes()) else {
            return Err(self.error(ParseErrorCode::UnterminatedProcessingInstruction, start));
        };
        let end = target_end + rel + PI_END.len();
        let target = &self.input[start + PI_START.len()..target_end];
        let kind = if target == "xml" {
            TokenKind::XmlDecl
        } else {
            TokenKind::ProcessingInstruction
        };
        self.emit(kind, start, end);
        Ok(())
    }

    fn doctype(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        let mut i = start + DOCTYPE_START.len();
        let mut subset_depth = 0usize;
        let mut quote: Option<u8> = None;
        while i < self.bytes.len() {
            let b = self.bytes[i];
            match quote {
                Some(q) if b == q => quote = None,
                Some(_) => {}
                None => match b {
                    b'"' | b'\'' => quote = Some(b),
                    b'[' => subset_depth += 1,
                    b']' => subset_depth = subset_depth.saturating_sub(1),
                    b'>' if subset_depth == 0 => {
                        self.emit(TokenKind::Doctype, start, i + 1);
                        return Ok(());
                    }
                    _ => {}
                },
            }
            i += 1;
        }
        Err(self.error(ParseErrorCode::UnterminatedDoctype, start))
    }

    fn end_tag(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        let name_end = self.scan_name(start + 2)?;
        self.emit(TokenKind::EndTag, start, name_end);
        self.whitespace();
        match self.bytes.get(self.pos) {
            Some(b'>') => {
                self.emit(TokenKind::TagClose, self.pos, self.pos + 1);
                Ok(())
            }
            Some(_) => Err(self.error(ParseErrorCode::UnexpectedCharacter, self.pos)),
            None => Err(self.error(ParseErrorCode::UnexpectedEof, self.pos)),
        }
    }

    fn start_tag(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        let name_end = self.scan_name(start + 1)?;
        self.emit(TokenKind::StartTag, start, name_end);

        loop {
            let separated = self.whitespace();
            let Some(&b) = self.bytes.get(self.pos) else {
                return Err(self.error(ParseErrorCode::UnexpectedEof, self.pos));
            };
            match b {
                b'>' => {
                    self.emit(TokenKind::TagClose, self.pos, self.pos + 1);
                    return Ok(());
                }
                b'/' => {
                    return match self.bytes.get(self.pos + 1) {
                        Some(b'>') => {
                            self.emit(TokenKind::EmptyTagClose, self.pos, self.pos + 2);
                            Ok(())
                        }
                        Some(_) => Err(self.error(ParseErrorCode::UnexpectedCharacter, self.pos)),
                        None => Err(self.error(ParseErrorCode::UnexpectedEof, self.pos + 1)),
                    };
                }
                // Attributes must be separated from the tag name and from each other.
                _ if !separated => {
                    return Err(self.error(ParseErrorCode::UnexpectedCharacter, self.pos));
                }
                _ => self.attribute()?,
            }
        }
    }

    fn attribute(&mut self) -> Result<(), ParseError> {
        let name_end = self.scan_name(self.pos)?;
        self.emit(TokenKind::AttributeName, self.pos, name_end);
        self.whitespace();
        match self.bytes.get(self.pos) {
            Some(b'=') => self.emit(TokenKind::AttributeEquals, self.pos, self.pos + 1),
            Some(_) => return Err(self.error(ParseErrorCode::MissingAttributeValue, self.pos)),
            None => return Err(self.error(ParseErrorCode::UnexpectedEof, self.pos)),
        }
        self.whitespace();
        let value_start = self.pos;
        let quote = match self.bytes.get(value_start) {
            Some(&q @ (b'"' | b'\'')) => q,
            Some(_) => return Err(self.error(ParseErrorCode::MissingAttributeValue, value_start)),
            None => return Err(self.error(ParseErrorCode::UnexpectedEof, value_start)),
        };
        let body_start = value_start + 1;
        let Some(rel) = memchr2(quote, b'<', &self.bytes[body_start..]) else {
            return Err(self.error(ParseErrorCode::UnterminatedAttributeValue, value_start));
        };
        let close = body_start + rel;
        if self.bytes[close] == b'<' {
            return Err(self.error(ParseErrorCode::UnexpectedCharacter, close));
        }
        self.emit(TokenKind::AttributeValue, value_start, close + 1);
        Ok(())
    }
}
