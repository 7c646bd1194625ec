use std::error;
use std::fmt;

/// Category of an error returned by the engine.
///
/// Every error surfaced to `error_cb` carries one of these, mapped to the
/// `"query parsing" | "query execution" | "unexpected"` kind strings at the
/// `run` boundary via [`ErrorKind::external_kind`].
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Misuse of aggregate functions, multiple `UNNEST`, or `DISTINCT`/
    /// `ORDER BY` combined with aggregation.
    Parsing,
    /// Arithmetic coercion failure, multi-match in `UPDATE`/`STRICT LEFT
    /// JOIN`, or a non-constant value in an aggregate output column.
    Runtime,
    /// Dynamic access to a missing field index.
    BadField,
    /// Anything outside the above taxonomy.
    Unexpected,
}

impl ErrorKind {
    pub fn with_message(self, message: impl Into<String>) -> Error {
        Error {
            kind: self,
            message: message.into(),
        }
    }

    /// The `(kind)` string half of the `error_cb(kind, message)` contract.
    pub const fn external_kind(self) -> &'static str {
        match self {
            ErrorKind::Parsing => "query parsing",
            ErrorKind::Runtime | ErrorKind::BadField => "query execution",
            ErrorKind::Unexpected => "unexpected",
        }
    }
}

/// Error type returned by the engine.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Error {
    kind: ErrorKind,
    message: String,
}

impl Error {
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn parsing(message: impl Into<String>) -> Self {
        ErrorKind::Parsing.with_message(message)
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        ErrorKind::Runtime.with_message(message)
    }

    /// `BadField(idx)` formatted per the driver's classification table:
    /// `"No 'a{idx+1}' column at record: {nr}"`.
    pub fn bad_field(idx: usize, nr: u64) -> Self {
        Error {
            kind: ErrorKind::BadField,
            message: format!("No 'a{}' column at record: {nr}", idx + 1),
        }
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        ErrorKind::Unexpected.with_message(message)
    }

    /// `(kind, message)` as handed to the external `error_cb`.
    pub fn as_external(&self) -> (&'static str, &str) {
        (self.kind.external_kind(), &self.message)
    }
}

impl error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_field_message_matches_classification_table() {
        let err = Error::bad_field(4, 7);
        assert_eq!(err.as_external(), ("query execution", "No 'a5' column at record: 7"));
    }

    #[test]
    fn parsing_error_external_kind() {
        let err = Error::parsing("Only one UNNEST is allowed per query");
        assert_eq!(err.kind(), ErrorKind::Parsing);
        assert_eq!(err.as_external().0, "query parsing");
    }
}
