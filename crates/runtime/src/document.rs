//! Shapes of the init and run documents.

use std::path::PathBuf;

use cirrus_action::Object;
use cirrus_json::{Map, Value};
use cirrus_loader::ArchiveSource;

use crate::error::RuntimeError;

/// Reserved top-level key holding the init message or the run input.
pub const VALUE_KEY: &str = "value";

/// `{"value": {"main": <entry point>, "code": <path> | {"binary": true, "value": <base64>}}}`
#[derive(Debug)]
pub struct InitRequest {
    pub entry_point: String,
    pub code: ArchiveSource,
}

impl TryFrom<Value> for InitRequest {
    type Error = RuntimeError;

    /// Anything not moved into the request is dropped here, which removes
    /// an extracted archive when the rest of the document is unusable.
    fn try_from(document: Value) -> Result<Self, Self::Error> {
        let mut root = into_object(document, "document")?;
        let mut message = match root.shift_remove(VALUE_KEY) {
            Some(Value::Object(message)) => message,
            Some(other) => {
                return Err(RuntimeError::invalid(format!(
                    "`value` must be an object, found {}",
                    other.kind()
                )));
            }
            None => return Err(RuntimeError::invalid("missing `value`")),
        };

        let entry_point = match message.shift_remove("main") {
            Some(Value::String(main)) if !main.is_empty() => main,
            Some(Value::String(_)) => return Err(RuntimeError::invalid("`value.main` is empty")),
            Some(other) => {
                return Err(RuntimeError::invalid(format!(
                    "`value.main` must be a string, found {}",
                    other.kind()
                )));
            }
            None => return Err(RuntimeError::invalid("missing `value.main`")),
        };

        let code = match message.shift_remove("code") {
            Some(Value::String(path)) => ArchiveSource::Path(PathBuf::from(path)),
            Some(Value::Object(mut code)) => match code.shift_remove(VALUE_KEY) {
                Some(Value::Binary(binary)) => ArchiveSource::Extracted(binary),
                _ => {
                    return Err(RuntimeError::invalid(
                        "`value.code` must be a path or {\"binary\": true, \"value\": <base64>}",
                    ));
                }
            },
            Some(other) => {
                return Err(RuntimeError::invalid(format!(
                    "`value.code` must be a path or a binary archive, found {}",
                    other.kind()
                )));
            }
            None => return Err(RuntimeError::invalid("missing `value.code`")),
        };

        Ok(Self { entry_point, code })
    }
}

/// The run document: the input under `value`, the environment everywhere else.
#[derive(Debug, Default, PartialEq)]
pub struct RunRequest {
    pub input: Object,
    pub env: Object,
}

impl TryFrom<Value> for RunRequest {
    type Error = RuntimeError;

    fn try_from(document: Value) -> Result<Self, Self::Error> {
        let mut root = into_object(document, "document")?;
        let input = match root.shift_remove(VALUE_KEY) {
            None | Some(Value::Null) => Object::new(),
            Some(Value::Object(input)) => to_json_object(input),
            Some(other) => {
                return Err(RuntimeError::invalid(format!(
                    "`value` must be an object, found {}",
                    other.kind()
                )));
            }
        };
        Ok(Self {
            input,
            env: to_json_object(root),
        })
    }
}

fn into_object(value: Value, what: &str) -> Result<Map, RuntimeError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(RuntimeError::invalid(format!(
            "{what} must be an object, found {}",
            other.kind()
        ))),
    }
}

fn to_json_object(map: Map) -> Object {
    map.into_iter().map(|(k, v)| (k, v.into())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cirrus_json::{CodeArchive, Parser};
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    fn init(text: &str) -> Result<InitRequest, RuntimeError> {
        InitRequest::try_from(cirrus_json::from_str(text).unwrap())
    }

    fn run(text: &str) -> Result<RunRequest, RuntimeError> {
        RunRequest::try_from(cirrus_json::from_str(text).unwrap())
    }

    #[test]
    fn init_with_a_path() {
        let request = init(r#"{"value": {"main": "demo.Echo", "code": "/tmp/echo.so"}}"#).unwrap();
        assert_eq!(request.entry_point, "demo.Echo");
        assert!(matches!(request.code, ArchiveSource::Path(ref p) if p.to_str() == Some("/tmp/echo.so")));
    }

    #[test]
    fn init_with_an_extracted_archive() {
        let dir = tempfile::tempdir().unwrap();
        let doc = r#"{"value": {"main": "demo.Echo", "code": {"binary": true, "value": "aGk="}}}"#;
        let value = Parser::new(doc.as_bytes())
            .with_matcher(CodeArchive)
            .spill_to(dir.path())
            .parse()
            .unwrap();
        let request = InitRequest::try_from(value).unwrap();
        assert!(matches!(request.code, ArchiveSource::Extracted(_)));
        assert_eq!(std::fs::read(request.code.path()).unwrap(), b"hi");
    }

    #[test]
    fn unusable_init_document_removes_the_extracted_archive() {
        let dir = tempfile::tempdir().unwrap();
        let doc = r#"{"value": {"main": 7, "code": {"binary": true, "value": "aGk="}}}"#;
        let value = Parser::new(doc.as_bytes())
            .with_matcher(CodeArchive)
            .spill_to(dir.path())
            .parse()
            .unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);

        let err = InitRequest::try_from(value).unwrap_err();
        assert!(matches!(err, RuntimeError::InvalidDocument(_)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[rstest]
    #[case::not_an_object("[]")]
    #[case::missing_value("{}")]
    #[case::value_not_object(r#"{"value": "x"}"#)]
    #[case::missing_main(r#"{"value": {"code": "/a.so"}}"#)]
    #[case::empty_main(r#"{"value": {"main": "", "code": "/a.so"}}"#)]
    #[case::missing_code(r#"{"value": {"main": "a"}}"#)]
    #[case::code_number(r#"{"value": {"main": "a", "code": 1}}"#)]
    #[case::code_object_without_binary(r#"{"value": {"main": "a", "code": {"value": "aGk="}}}"#)]
    fn malformed_init_documents(#[case] text: &str) {
        assert!(matches!(init(text), Err(RuntimeError::InvalidDocument(_))));
    }

    #[test]
    fn run_splits_input_from_environment() {
        let request = run(r#"{"value": {"a": 1}, "__OW_ACTIVATION_ID": "abc"}"#).unwrap();
        assert_eq!(serde_json::Value::Object(request.input), json!({"a": 1}));
        assert_eq!(
            serde_json::Value::Object(request.env),
            json!({"__OW_ACTIVATION_ID": "abc"})
        );
    }

    #[rstest]
    #[case::absent(r#"{"__OW_NAMESPACE": "guest"}"#)]
    #[case::null(r#"{"value": null, "__OW_NAMESPACE": "guest"}"#)]
    fn run_without_input_is_empty(#[case] text: &str) {
        let request = run(text).unwrap();
        assert!(request.input.is_empty());
        assert_eq!(request.env.len(), 1);
    }

    #[rstest]
    #[case::array_input(r#"{"value": [1]}"#)]
    #[case::string_input(r#"{"value": "a"}"#)]
    #[case::not_an_object("3")]
    fn malformed_run_documents(#[case] text: &str) {
        assert!(matches!(run(text), Err(RuntimeError::InvalidDocument(_))));
    }
}
