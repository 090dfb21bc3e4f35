//! Parse error type.

use std::io;

/// What went wrong while reading a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The input does not follow the grammar.
    Syntax,
    /// The underlying stream failed.
    Io,
    /// A binary payload could not be decoded or stored.
    Binary,
}

/// Error raised for every malformed-input condition.
///
/// `line` and `column` are 1-based and point at the offending character.
#[derive(Debug, thiserror::Error)]
#[error("{message} at {line}:{column}")]
pub struct ParseError {
    kind: ErrorKind,
    message: String,
    line: usize,
    column: usize,
    #[source]
    source: Option<io::Error>,
}

impl ParseError {
    pub(crate) fn syntax(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            kind: ErrorKind::Syntax,
            message: message.into(),
            line,
            column,
            source: None,
        }
    }

    pub(crate) fn io(source: io::Error, line: usize, column: usize) -> Self {
        Self {
            kind: ErrorKind::Io,
            message: format!("I/O error: {source}"),
            line,
            column,
            source: Some(source),
        }
    }

    pub(crate) fn binary(message: impl Into<String>, source: io::Error, line: usize, column: usize) -> Self {
        Self {
            kind: ErrorKind::Binary,
            message: message.into(),
            line,
            column,
            source: Some(source),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The message without the position suffix.
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn column(&self) -> usize {
        self.column
    }

    /// Carry a parse error through an `io::Read` boundary.
    pub(crate) fn into_io(self) -> io::Error {
        io::Error::new(io::ErrorKind::InvalidData, self)
    }

    /// Recover a parse error smuggled through [`into_io`](Self::into_io).
    pub(crate) fn from_io(err: io::Error) -> Result<Self, io::Error> {
        if !err.get_ref().is_some_and(|inner| inner.is::<Self>()) {
            return Err(err);
        }
        match err.into_inner().map(|inner| inner.downcast::<Self>()) {
            Some(Ok(parse)) => Ok(*parse),
            Some(Err(other)) => Err(io::Error::new(io::ErrorKind::InvalidData, other)),
            None => Err(io::Error::from(io::ErrorKind::InvalidData)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_position() {
        let err = ParseError::syntax("Expected value", 3, 14);
        assert_eq!(err.to_string(), "Expected value at 3:14");
        assert_eq!(err.kind(), ErrorKind::Syntax);
        assert_eq!(err.message(), "Expected value");
    }

    #[test]
    fn survives_io_round_trip() {
        let err = ParseError::syntax("Expected base64 character", 1, 7).into_io();
        let back = ParseError::from_io(err).unwrap();
        assert_eq!((back.line(), back.column()), (1, 7));
    }

    #[test]
    fn foreign_io_errors_are_left_alone() {
        let err = io::Error::other("disk full");
        assert!(ParseError::from_io(err).is_err());
    }
}
