//! Streaming base64 extraction into a temporary file.

use std::io::{self, BufWriter, Read};

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::read::DecoderReader;

use crate::error::ParseError;
use crate::frame::BinaryMatcher;
use crate::parser::Parser;
use crate::value::{BinaryRef, Value};

/// Standard alphabet; trailing `=` padding is accepted but not required.
const PAYLOAD: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

const FILE_PREFIX: &str = "useraction-";

impl<R: Read, M: BinaryMatcher> Parser<R, M> {
    /// Stream the string at the lookahead through a base64 decoder into a
    /// fresh temporary file. The file is removed if anything fails.
    pub(crate) fn read_binary(&mut self) -> Result<Value, ParseError> {
        let (line, column) = (self.line, self.column);
        let mut builder = tempfile::Builder::new();
        builder.prefix(FILE_PREFIX).suffix(std::env::consts::DLL_SUFFIX);
        let file = match &self.spill_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(|err| ParseError::binary("Cannot create archive file", err, line, column))?;

        self.read()?;
        let mut writer = BufWriter::new(file);
        let copied = {
            let mut decoder = DecoderReader::new(QuotedBase64 { parser: &mut *self }, &PAYLOAD);
            io::copy(&mut decoder, &mut writer)
        };
        let written = copied.map_err(|err| self.binary_failure(err))?;
        let file = writer.into_inner().map_err(|err| {
            ParseError::binary("Cannot write archive file", err.into_error(), line, column)
        })?;
        let path = file.into_temp_path();
        self.read()?;

        tracing::debug!(bytes = written, path = %path.display(), "extracted binary payload");
        Ok(Value::Binary(BinaryRef::new(path)))
    }

    fn binary_failure(&self, err: io::Error) -> ParseError {
        match ParseError::from_io(err) {
            Ok(parse) => parse,
            Err(err) if err.kind() == io::ErrorKind::InvalidData => {
                ParseError::binary("Invalid base64 payload", err, self.line, self.column)
            }
            Err(err) => ParseError::binary("Cannot write archive file", err, self.line, self.column),
        }
    }

    /// Fill `buf` with payload characters up to the closing quote.
    fn read_base64_chunk(&mut self, buf: &mut [u8]) -> Result<usize, ParseError> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.current {
                Some(b'"') => break,
                Some(byte) if is_base64(byte) => {
                    buf[filled] = byte;
                    filled += 1;
                    self.read()?;
                }
                Some(_) => return Err(self.expected("base64 character")),
                None => return Err(self.error("Unexpected end of input")),
            }
        }
        Ok(filled)
    }
}

/// The characters of a quoted string as a byte stream, ending before the
/// closing quote.
struct QuotedBase64<'a, R, M> {
    parser: &'a mut Parser<R, M>,
}

impl<R: Read, M: BinaryMatcher> Read for QuotedBase64<'_, R, M> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.parser
            .read_base64_chunk(buf)
            .map_err(ParseError::into_io)
    }
}

fn is_base64(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'+' | b'/' | b'=')
}
