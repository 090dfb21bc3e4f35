//! Open-container stack and the binary-extraction predicate.
//!
//! The parser keeps every container it is currently filling on an explicit
//! stack. Besides driving the grammar, the stack is the parser's notion of
//! "where am I": a [`BinaryMatcher`] looks at it before each string value and
//! decides whether that string is decoded normally or streamed to disk.

use crate::value::{Map, Value};

/// A container that has been opened but not yet closed.
#[derive(Debug)]
pub enum Frame {
    /// An array and the elements read so far.
    Array(Vec<Value>),
    /// An object, the entries read so far, and the key whose value is
    /// currently being read.
    Object {
        /// Completed entries.
        entries: Map,
        /// Key of the entry in progress.
        key: Option<String>,
    },
}

impl Frame {
    pub(crate) fn object() -> Self {
        Self::Object {
            entries: Map::new(),
            key: None,
        }
    }

    /// The key being filled, for object frames.
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Object { key, .. } => key.as_deref(),
            Self::Array(_) => None,
        }
    }

    /// Entries completed so far, for object frames.
    pub fn entries(&self) -> Option<&Map> {
        match self {
            Self::Object { entries, .. } => Some(entries),
            Self::Array(_) => None,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Self::Array(_))
    }
}

/// Decides, from the current frame stack, whether the next string value is
/// a base64 payload to extract.
///
/// `frames[0]` is the root container; the last element is the innermost.
pub trait BinaryMatcher {
    fn matches(&self, frames: &[Frame]) -> bool;
}

impl<F> BinaryMatcher for F
where
    F: Fn(&[Frame]) -> bool,
{
    fn matches(&self, frames: &[Frame]) -> bool {
        self(frames)
    }
}

/// Never extracts; every string is decoded into memory.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainStrings;

impl BinaryMatcher for PlainStrings {
    fn matches(&self, _frames: &[Frame]) -> bool {
        false
    }
}

/// Matches the code archive of an init document:
///
/// ```json
/// {"value": {"code": {"binary": true, "value": "<base64>"}}}
/// ```
///
/// The string sits at depth 4 (root, `value`, `code`, string). `binary` must
/// already be recorded in the `code` object when `value` starts, since the
/// stream is read once.
#[derive(Debug, Clone, Copy, Default)]
pub struct CodeArchive;

impl BinaryMatcher for CodeArchive {
    fn matches(&self, frames: &[Frame]) -> bool {
        let [root, message, code] = frames else {
            return false;
        };
        root.key() == Some("value")
            && message.key() == Some("code")
            && code.key() == Some("value")
            && code
                .entries()
                .and_then(|entries| entries.get("binary"))
                .and_then(Value::as_bool)
                == Some(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn object(key: &str, entries: Vec<(&str, Value)>) -> Frame {
        Frame::Object {
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.to_owned(), v))
                .collect(),
            key: Some(key.to_owned()),
        }
    }

    fn code_path(binary: Value) -> Vec<Frame> {
        vec![
            object("value", vec![]),
            object("code", vec![("main", Value::String("demo.Echo".into()))]),
            object("value", vec![("binary", binary)]),
        ]
    }

    #[test]
    fn code_archive_matches_exact_shape() {
        assert!(CodeArchive.matches(&code_path(Value::Bool(true))));
    }

    #[rstest]
    #[case::binary_false(Value::Bool(false))]
    #[case::binary_string(Value::String("true".into()))]
    #[case::binary_null(Value::Null)]
    fn code_archive_requires_binary_true(#[case] binary: Value) {
        assert!(!CodeArchive.matches(&code_path(binary)));
    }

    #[test]
    fn code_archive_rejects_other_depths() {
        let mut deeper = code_path(Value::Bool(true));
        deeper.insert(0, object("value", vec![]));
        assert!(!CodeArchive.matches(&deeper));

        let shallower = vec![
            object("code", vec![]),
            object("value", vec![("binary", Value::Bool(true))]),
        ];
        assert!(!CodeArchive.matches(&shallower));
    }

    #[test]
    fn code_archive_rejects_other_keys() {
        let frames = vec![
            object("value", vec![]),
            object("source", vec![]),
            object("value", vec![("binary", Value::Bool(true))]),
        ];
        assert!(!CodeArchive.matches(&frames));
    }

    #[test]
    fn code_archive_rejects_arrays_on_path() {
        let frames = vec![
            object("value", vec![]),
            Frame::Array(Vec::new()),
            object("value", vec![("binary", Value::Bool(true))]),
        ];
        assert!(!CodeArchive.matches(&frames));
    }

    #[test]
    fn plain_strings_never_match() {
        assert!(!PlainStrings.matches(&code_path(Value::Bool(true))));
    }

    #[test]
    fn closures_are_matchers() {
        let top_level = |frames: &[Frame]| frames.len() == 1;
        assert!(top_level.matches(&[Frame::object()]));
    }
}
