//! Recursive-descent reader over a byte stream.

use std::io::{self, BufRead, BufReader, Read};
use std::path::PathBuf;

use crate::error::ParseError;
use crate::frame::{BinaryMatcher, Frame, PlainStrings};
use crate::value::Value;

/// Containers nested deeper than this are rejected.
pub const MAX_DEPTH: usize = 512;

/// Single-pass document reader.
///
/// Keeps one byte of lookahead and an explicit [`Frame`] stack. Before each
/// string value the configured [`BinaryMatcher`] is asked whether the string
/// should be streamed to a temporary file instead of being decoded.
///
/// ```
/// use cirrus_json::{CodeArchive, Parser, Value};
///
/// let doc = br#"{"value": {"main": "demo.Echo", "code": {"binary": true, "value": "aGk="}}}"#;
/// let value = Parser::new(&doc[..]).with_matcher(CodeArchive).parse()?;
/// let code = value.get("value").and_then(|v| v.get("code")).and_then(|c| c.get("value"));
/// assert!(matches!(code, Some(Value::Binary(_))));
/// # Ok::<(), cirrus_json::ParseError>(())
/// ```
pub struct Parser<R, M = PlainStrings> {
    input: BufReader<R>,
    pub(crate) current: Option<u8>,
    pub(crate) line: usize,
    pub(crate) column: usize,
    frames: Vec<Frame>,
    recorder: Vec<u8>,
    matcher: M,
    pub(crate) spill_dir: Option<PathBuf>,
}

impl<R: Read> Parser<R, PlainStrings> {
    pub fn new(reader: R) -> Self {
        Self {
            input: BufReader::new(reader),
            current: None,
            line: 1,
            column: 1,
            frames: Vec::new(),
            recorder: Vec::new(),
            matcher: PlainStrings,
            spill_dir: None,
        }
    }
}

impl<R: Read, M: BinaryMatcher> Parser<R, M> {
    /// Replace the binary-extraction predicate.
    pub fn with_matcher<N: BinaryMatcher>(self, matcher: N) -> Parser<R, N> {
        Parser {
            input: self.input,
            current: self.current,
            line: self.line,
            column: self.column,
            frames: self.frames,
            recorder: self.recorder,
            matcher,
            spill_dir: self.spill_dir,
        }
    }

    /// Directory for extracted binaries. Defaults to the system temp dir.
    pub fn spill_to(mut self, dir: impl Into<PathBuf>) -> Self {
        self.spill_dir = Some(dir.into());
        self
    }

    /// Read exactly one value followed only by whitespace.
    pub fn parse(mut self) -> Result<Value, ParseError> {
        self.current = self.next_byte()?;
        self.skip_whitespace()?;
        let value = self.read_value()?;
        self.skip_whitespace()?;
        if self.current.is_some() {
            return Err(self.error("Unexpected character"));
        }
        Ok(value)
    }

    fn read_value(&mut self) -> Result<Value, ParseError> {
        match self.current {
            Some(b'n') => self.read_literal(b"null", Value::Null),
            Some(b't') => self.read_literal(b"true", Value::Bool(true)),
            Some(b'f') => self.read_literal(b"false", Value::Bool(false)),
            Some(b'"') if self.matcher.matches(&self.frames) => self.read_binary(),
            Some(b'"') => self.read_string().map(Value::String),
            Some(b'[') => self.read_array(),
            Some(b'{') => self.read_object(),
            Some(b'-' | b'0'..=b'9') => self.read_number().map(Value::Number),
            _ => Err(self.expected("value")),
        }
    }

    fn read_array(&mut self) -> Result<Value, ParseError> {
        self.read()?;
        self.open(Frame::Array(Vec::new()))?;
        self.skip_whitespace()?;
        if !self.read_char(b']')? {
            loop {
                self.skip_whitespace()?;
                let value = self.read_value()?;
                if let Some(Frame::Array(items)) = self.frames.last_mut() {
                    items.push(value);
                }
                self.skip_whitespace()?;
                if !self.read_char(b',')? {
                    break;
                }
            }
            if !self.read_char(b']')? {
                return Err(self.expected("',' or ']'"));
            }
        }
        self.close()
    }

    fn read_object(&mut self) -> Result<Value, ParseError> {
        self.read()?;
        self.open(Frame::object())?;
        self.skip_whitespace()?;
        if !self.read_char(b'}')? {
            loop {
                self.skip_whitespace()?;
                let name = self.read_name()?;
                if let Some(Frame::Object { key, .. }) = self.frames.last_mut() {
                    *key = Some(name);
                }
                self.skip_whitespace()?;
                if !self.read_char(b':')? {
                    return Err(self.expected("':'"));
                }
                self.skip_whitespace()?;
                let value = self.read_value()?;
                if let Some(Frame::Object { entries, key }) = self.frames.last_mut() {
                    if let Some(name) = key.take() {
                        entries.insert(name, value);
                    }
                }
                self.skip_whitespace()?;
                if !self.read_char(b',')? {
                    break;
                }
            }
            if !self.read_char(b'}')? {
                return Err(self.expected("',' or '}'"));
            }
        }
        self.close()
    }

    fn open(&mut self, frame: Frame) -> Result<(), ParseError> {
        if self.frames.len() >= MAX_DEPTH {
            return Err(self.error("Maximum nesting depth exceeded"));
        }
        self.frames.push(frame);
        Ok(())
    }

    fn close(&mut self) -> Result<Value, ParseError> {
        match self.frames.pop() {
            Some(Frame::Array(items)) => Ok(Value::Array(items)),
            Some(Frame::Object { entries, .. }) => Ok(Value::Object(entries)),
            None => Err(self.error("Unbalanced container")),
        }
    }

    fn read_literal(&mut self, word: &[u8], value: Value) -> Result<Value, ParseError> {
        self.read()?;
        for &ch in &word[1..] {
            self.read_required_char(ch)?;
        }
        Ok(value)
    }

    fn read_required_char(&mut self, ch: u8) -> Result<(), ParseError> {
        if self.read_char(ch)? {
            Ok(())
        } else {
            Err(self.expected(&format!("'{}'", ch as char)))
        }
    }

    fn read_name(&mut self) -> Result<String, ParseError> {
        if self.current != Some(b'"') {
            return Err(self.expected("name"));
        }
        self.read_string()
    }

    fn read_string(&mut self) -> Result<String, ParseError> {
        self.read()?;
        self.recorder.clear();
        loop {
            match self.current {
                Some(b'"') => break,
                Some(b'\\') => self.read_escape()?,
                Some(byte) if byte < 0x20 => return Err(self.expected("valid string character")),
                Some(byte) => {
                    self.recorder.push(byte);
                    self.read()?;
                }
                None => return Err(self.error("Unexpected end of input")),
            }
        }
        let text = String::from_utf8(std::mem::take(&mut self.recorder))
            .map_err(|_| self.error("Invalid UTF-8 in string"))?;
        self.read()?;
        Ok(text)
    }

    fn read_escape(&mut self) -> Result<(), ParseError> {
        self.read()?;
        let ch = match self.current {
            Some(b'"') => '"',
            Some(b'/') => '/',
            Some(b'\\') => '\\',
            Some(b'b') => '\u{8}',
            Some(b'f') => '\u{c}',
            Some(b'n') => '\n',
            Some(b'r') => '\r',
            Some(b't') => '\t',
            Some(b'u') => self.read_unicode_escape()?,
            _ => return Err(self.expected("valid escape sequence")),
        };
        let mut utf8 = [0; 4];
        self.recorder
            .extend_from_slice(ch.encode_utf8(&mut utf8).as_bytes());
        self.read()
    }

    /// Decode `uXXXX`, pairing UTF-16 surrogates. Leaves the lookahead on the
    /// last hex digit.
    fn read_unicode_escape(&mut self) -> Result<char, ParseError> {
        let first = self.read_hex4()?;
        let code = match first {
            0xD800..=0xDBFF => {
                self.read()?;
                if self.current != Some(b'\\') {
                    return Err(self.expected("low surrogate escape"));
                }
                self.read()?;
                if self.current != Some(b'u') {
                    return Err(self.expected("low surrogate escape"));
                }
                let second = self.read_hex4()?;
                if !(0xDC00..=0xDFFF).contains(&second) {
                    return Err(self.error("Invalid low surrogate"));
                }
                0x10000 + ((first - 0xD800) << 10) + (second - 0xDC00)
            }
            0xDC00..=0xDFFF => return Err(self.error("Unpaired low surrogate")),
            other => other,
        };
        char::from_u32(code).ok_or_else(|| self.error("Invalid unicode escape"))
    }

    fn read_hex4(&mut self) -> Result<u32, ParseError> {
        let mut code = 0;
        for _ in 0..4 {
            self.read()?;
            let digit = self
                .current
                .and_then(|byte| char::from(byte).to_digit(16))
                .ok_or_else(|| self.expected("hexadecimal digit"))?;
            code = code * 16 + digit;
        }
        Ok(code)
    }

    fn read_number(&mut self) -> Result<f64, ParseError> {
        self.recorder.clear();
        self.read_and_append(b'-')?;
        let first_digit = self.current;
        if !self.read_and_append_digit()? {
            return Err(self.expected("digit"));
        }
        if first_digit != Some(b'0') {
            while self.read_and_append_digit()? {}
        }
        self.read_fraction()?;
        self.read_exponent()?;
        std::str::from_utf8(&self.recorder)
            .ok()
            .and_then(|text| text.parse::<f64>().ok())
            .ok_or_else(|| self.error("Invalid number"))
    }

    fn read_fraction(&mut self) -> Result<(), ParseError> {
        if !self.read_and_append(b'.')? {
            return Ok(());
        }
        if !self.read_and_append_digit()? {
            return Err(self.expected("digit"));
        }
        while self.read_and_append_digit()? {}
        Ok(())
    }

    fn read_exponent(&mut self) -> Result<(), ParseError> {
        if !self.read_and_append(b'e')? && !self.read_and_append(b'E')? {
            return Ok(());
        }
        if !self.read_and_append(b'+')? {
            self.read_and_append(b'-')?;
        }
        if !self.read_and_append_digit()? {
            return Err(self.expected("digit"));
        }
        while self.read_and_append_digit()? {}
        Ok(())
    }

    fn read_and_append(&mut self, ch: u8) -> Result<bool, ParseError> {
        if self.current != Some(ch) {
            return Ok(false);
        }
        self.recorder.push(ch);
        self.read()?;
        Ok(true)
    }

    fn read_and_append_digit(&mut self) -> Result<bool, ParseError> {
        match self.current {
            Some(digit @ b'0'..=b'9') => {
                self.recorder.push(digit);
                self.read()?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn read_char(&mut self, ch: u8) -> Result<bool, ParseError> {
        if self.current != Some(ch) {
            return Ok(false);
        }
        self.read()?;
        Ok(true)
    }

    fn skip_whitespace(&mut self) -> Result<(), ParseError> {
        while matches!(self.current, Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.read()?;
        }
        Ok(())
    }

    /// Advance the lookahead by one byte, tracking line and column.
    pub(crate) fn read(&mut self) -> Result<(), ParseError> {
        let Some(previous) = self.current else {
            return Err(self.error("Unexpected end of input"));
        };
        self.current = self.next_byte()?;
        if previous == b'\n' {
            self.line += 1;
            self.column = 1;
        } else if !self.current.is_some_and(is_continuation_byte) {
            self.column += 1;
        }
        Ok(())
    }

    fn next_byte(&mut self) -> Result<Option<u8>, ParseError> {
        loop {
            match self.input.fill_buf().map(|buf| buf.first().copied()) {
                Ok(Some(byte)) => {
                    self.input.consume(1);
                    return Ok(Some(byte));
                }
                Ok(None) => return Ok(None),
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => return Err(ParseError::io(err, self.line, self.column)),
            }
        }
    }

    pub(crate) fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::syntax(message, self.line, self.column)
    }

    pub(crate) fn expected(&self, what: &str) -> ParseError {
        if self.current.is_none() {
            self.error("Unexpected end of input")
        } else {
            self.error(format!("Expected {what}"))
        }
    }
}

fn is_continuation_byte(byte: u8) -> bool {
    byte & 0b1100_0000 == 0b1000_0000
}
