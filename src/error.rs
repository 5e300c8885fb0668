//! Crate-wide error type.

use crate::types::DataType;

/// Errors raised while parsing, transforming or writing a payload.
///
/// Every error propagates out of the innermost `apply` call unchanged; the
/// core never retries. Type mismatches met while merging a tagged stream
/// against a schema are not errors: they are delivered as unknown fields.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Truncated input or a failing writer.
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    #[error("Stream: {0}")]
    Stream(String),
    #[error("Stream: invalid data type {0}")]
    InvalidDataType(u8),
    #[error("Unknown protocol{}", fmt_magic(.magic))]
    UnknownProtocol { magic: Option<u16> },
    #[error("De-serialization failed: required field {id} is missing from {qualified_name}")]
    MissingField { id: u16, qualified_name: String },
    #[error("Mismatched type: expected {expected:?}, found {actual:?}")]
    MismatchedType { expected: DataType, actual: DataType },
    #[error("Schema: {0}")]
    Schema(String),
    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

fn fmt_magic(magic: &Option<u16>) -> String {
    match magic {
        Some(m) => format!(" 0x{m:04x}"),
        None => String::new(),
    }
}

impl CoreError {
    /// True for malformed or truncated input, as opposed to schema or
    /// assignment failures.
    pub fn is_stream_error(&self) -> bool {
        matches!(
            self,
            CoreError::Io(_) | CoreError::Stream(_) | CoreError::InvalidDataType(_) | CoreError::Json(_)
        )
    }

    #[cold]
    pub(crate) fn stream(msg: impl Into<String>) -> Self {
        CoreError::Stream(msg.into())
    }

    #[cold]
    pub(crate) fn mismatch(expected: DataType, actual: DataType) -> Self {
        CoreError::MismatchedType { expected, actual }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_message() {
        let e = CoreError::MissingField { id: 3, qualified_name: "test.Record".into() };
        assert_eq!(
            e.to_string(),
            "De-serialization failed: required field 3 is missing from test.Record"
        );
    }

    #[test]
    fn unknown_protocol_message() {
        assert_eq!(CoreError::UnknownProtocol { magic: Some(0x1234) }.to_string(), "Unknown protocol 0x1234");
        assert_eq!(CoreError::UnknownProtocol { magic: None }.to_string(), "Unknown protocol");
    }
}
