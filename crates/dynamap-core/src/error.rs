//! Error types for all dynamap operations.

use std::fmt;

use thiserror::Error;

/// Top-level error type for dynamap operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error(transparent)]
    Decoding(#[from] DecodingError),

    #[error(transparent)]
    Build(#[from] BuildError),

    /// A write precondition did not hold against the stored item.
    #[error("conditional check failed")]
    ConditionFailed,

    #[error("item not found in collection '{collection}'")]
    NotFound { collection: String },

    /// Any other failure reported by the store client, passed through unchanged.
    #[error("store request failed: {0}")]
    Transport(#[source] StoreError),
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ConditionFailed => Error::ConditionFailed,
            other => Error::Transport(other),
        }
    }
}

/// Errors produced while turning a record into attribute values.
#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("unsupported type {type_name} at {}", Path(.field))]
    Unsupported {
        field: String,
        type_name: &'static str,
    },

    #[error("number at {} cannot be stored exactly: {source}", Path(.field))]
    Number {
        field: String,
        #[source]
        source: NumberError,
    },

    #[error("record must encode to a map, got {0}")]
    NotAMap(&'static str),

    #[error("missing key attribute: {0}")]
    MissingKeyAttribute(String),

    #[error("range key '{0}' given for a table without a range key")]
    UnexpectedRangeKey(String),

    #[error("key attribute '{name}' must be S, N or B, got {type_tag}")]
    InvalidKeyType {
        name: String,
        type_tag: &'static str,
    },

    #[error("item exceeds maximum size of {max} bytes (got {actual})")]
    ItemTooLarge { max: usize, actual: usize },

    #[error("{message} at {}", Path(.field))]
    Custom { field: String, message: String },
}

impl EncodingError {
    /// Prefix the error's field path with `segment` (a field name or `[i]`).
    pub(crate) fn at(self, segment: &str) -> Self {
        match self {
            EncodingError::Unsupported { field, type_name } => EncodingError::Unsupported {
                field: join_path(segment, &field),
                type_name,
            },
            EncodingError::Number { field, source } => EncodingError::Number {
                field: join_path(segment, &field),
                source,
            },
            EncodingError::Custom { field, message } => EncodingError::Custom {
                field: join_path(segment, &field),
                message,
            },
            other => other,
        }
    }

    /// The dotted path of the offending field, when the error has one.
    pub fn field(&self) -> Option<&str> {
        match self {
            EncodingError::Unsupported { field, .. }
            | EncodingError::Number { field, .. }
            | EncodingError::Custom { field, .. } => Some(field),
            EncodingError::MissingKeyAttribute(name)
            | EncodingError::UnexpectedRangeKey(name)
            | EncodingError::InvalidKeyType { name, .. } => Some(name),
            EncodingError::NotAMap(_) | EncodingError::ItemTooLarge { .. } => None,
        }
    }
}

impl serde::ser::Error for EncodingError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        EncodingError::Custom {
            field: String::new(),
            message: msg.to_string(),
        }
    }
}

/// Reasons a native number has no exact decimal form in the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NumberError {
    #[error("NaN has no decimal representation")]
    NaN,

    #[error("infinite values have no decimal representation")]
    Infinite,

    #[error("{digits} significant digits exceeds the maximum of {max}")]
    Precision { digits: usize, max: usize },

    #[error("magnitude 1e{exponent} is outside the supported range")]
    Exponent { exponent: i64 },

    #[error("'{0}' is not a decimal number")]
    Malformed(String),
}

/// Errors produced while turning attribute values back into a record.
#[derive(Debug, Error)]
pub enum DecodingError {
    #[error("missing required field {}", Path(.0))]
    MissingField(String),

    #[error("expected {expected} at {}, found {found}", Path(.field))]
    TypeMismatch {
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("cannot parse number '{value}' as {target} at {}", Path(.field))]
    InvalidNumber {
        field: String,
        value: String,
        target: &'static str,
    },

    #[error("{message} at {}", Path(.field))]
    Custom { field: String, message: String },
}

impl DecodingError {
    pub(crate) fn at(self, segment: &str) -> Self {
        match self {
            DecodingError::MissingField(field) => {
                DecodingError::MissingField(join_path(segment, &field))
            }
            DecodingError::TypeMismatch {
                field,
                expected,
                found,
            } => DecodingError::TypeMismatch {
                field: join_path(segment, &field),
                expected,
                found,
            },
            DecodingError::InvalidNumber {
                field,
                value,
                target,
            } => DecodingError::InvalidNumber {
                field: join_path(segment, &field),
                value,
                target,
            },
            DecodingError::Custom { field, message } => DecodingError::Custom {
                field: join_path(segment, &field),
                message,
            },
        }
    }

    pub(crate) fn mismatch(expected: &'static str, found: &'static str) -> Self {
        DecodingError::TypeMismatch {
            field: String::new(),
            expected,
            found,
        }
    }

    /// The dotted path of the offending field.
    pub fn field(&self) -> &str {
        match self {
            DecodingError::MissingField(field)
            | DecodingError::TypeMismatch { field, .. }
            | DecodingError::InvalidNumber { field, .. }
            | DecodingError::Custom { field, .. } => field,
        }
    }
}

impl serde::de::Error for DecodingError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        DecodingError::Custom {
            field: String::new(),
            message: msg.to_string(),
        }
    }

    fn missing_field(field: &'static str) -> Self {
        DecodingError::MissingField(field.to_string())
    }
}

/// Errors produced while compiling a condition into an expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("placeholder '{token}' is bound more than once")]
    PlaceholderCollision { token: String },

    #[error("'in' on field '{field}' needs at least one operand")]
    EmptyIn { field: String },

    #[error("condition references an empty field name")]
    EmptyFieldName,
}

/// Errors reported by a [`Store`](crate::store::Store) implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("conditional check failed")]
    ConditionFailed,

    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("request throttled")]
    Throttled,

    #[error("request timed out")]
    Timeout,

    #[error("request cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    /// Whether the failure is transient and the caller may retry.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StoreError::Throttled | StoreError::Timeout | StoreError::Io(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

fn join_path(segment: &str, rest: &str) -> String {
    if rest.is_empty() {
        segment.to_string()
    } else if rest.starts_with('[') {
        format!("{segment}{rest}")
    } else {
        format!("{segment}.{rest}")
    }
}

/// Renders a field path, naming the record itself when the path is empty.
struct Path<'a>(&'a String);

impl fmt::Display for Path<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("<record>")
        } else {
            write!(f, "'{}'", self.0)
        }
    }
}
