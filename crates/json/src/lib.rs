#![forbid(unsafe_code)]

//! # Cirrus JSON
//!
//! Single-pass reader for the runtime's control documents.
//!
//! This crate provides:
//! - [`Parser`] -- streaming recursive-descent reader with positioned errors
//! - [`BinaryMatcher`] -- context predicate deciding which strings are binary
//! - [`CodeArchive`] -- the matcher for the code archive of an init document
//! - [`Value`] / [`BinaryRef`] -- the parsed tree; binaries live in temp files
//!
//! A string picked out by the matcher is never held in memory: its base64
//! characters are decoded as they arrive and written straight to a temporary
//! file, and the tree holds a [`BinaryRef`] in its place.

mod binary;
pub mod error;
pub mod frame;
pub mod parser;
pub mod value;

use std::io::Read;

pub use error::{ErrorKind, ParseError};
pub use frame::{BinaryMatcher, CodeArchive, Frame, PlainStrings};
pub use parser::{MAX_DEPTH, Parser};
pub use value::{BinaryRef, Map, Value, number_to_json};

/// Parse a document from a stream without binary extraction.
pub fn from_reader<R: Read>(reader: R) -> Result<Value, ParseError> {
    Parser::new(reader).parse()
}

/// Parse a document held in memory without binary extraction.
pub fn from_slice(bytes: &[u8]) -> Result<Value, ParseError> {
    from_reader(bytes)
}

/// Parse a document held in a string without binary extraction.
pub fn from_str(text: &str) -> Result<Value, ParseError> {
    from_slice(text.as_bytes())
}
