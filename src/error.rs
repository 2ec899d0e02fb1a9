use thiserror::Error;

/// Result type used across the engine.
pub type Result<T> = std::result::Result<T, DbError>;

/// Stable category of a [DbError], for callers that branch on the kind of failure
/// rather than on its message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Schema,
    TypeMismatch,
    OperatorUnsupported,
    Consistency,
    Range,
    Parse,
}

/// Errors raised while executing a statement.
///
/// All of them are raised synchronously and before any mutation when they come
/// from validation. [DbError::Consistency] is the exception: it reports that the
/// table and its indexes already disagree, and the table should not be trusted
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DbError {
    /// Unknown table/column/index, or a duplicate table/index name.
    #[error("schema error: {0}")]
    Schema(String),

    /// A value's type disagrees with its column's declared type.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// The operator cannot be answered through an index.
    #[error("operator {0} is not supported by index lookups")]
    OperatorUnsupported(String),

    /// An index or a cursor points at a tombstoned or missing row.
    #[error("consistency error: {0}")]
    Consistency(String),

    /// Negative limit or offset.
    #[error("range error: {0}")]
    Range(String),

    /// Statement text could not be tokenized or parsed.
    #[error("parse error: {0}")]
    Parse(String),
}

impl DbError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Schema(_) => ErrorKind::Schema,
            Self::TypeMismatch(_) => ErrorKind::TypeMismatch,
            Self::OperatorUnsupported(_) => ErrorKind::OperatorUnsupported,
            Self::Consistency(_) => ErrorKind::Consistency,
            Self::Range(_) => ErrorKind::Range,
            Self::Parse(_) => ErrorKind::Parse,
        }
    }
}
