use std::io;

use thiserror::Error;

/// Unified error type for the schemata library.
///
/// One variant per failure category. Compile failures (`SchemaParse`,
/// `SchemaValidation`) abort the whole compile; the remaining variants are
/// produced by generic data operations and never affect a compiled schema.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed JSON or a structurally invalid schema document.
    #[error("Schema Parse Error: {message}{}", fragment_suffix(.fragment))]
    SchemaParse {
        message: String,
        fragment: Option<String>,
    },

    /// A semantic schema invariant was violated.
    #[error("Schema Validation Error: {message}{}", fragment_suffix(.fragment))]
    SchemaValidation {
        message: String,
        fragment: Option<String>,
    },

    /// A datum matched none of the branches of a union.
    #[error("Unresolved Union: datum {datum} not in union {union}")]
    UnresolvedUnion { union: String, datum: String },

    /// An operation was invoked against the wrong node kind.
    #[error("Type Mismatch: {0}")]
    TypeMismatch(String),

    /// A schema/value pair that cannot be deep-copied.
    #[error("Deep Copy Error: {0}")]
    DeepCopy(String),

    /// A default value was requested for a field that declares none.
    #[error("Missing Default: field '{0}' has no default value")]
    MissingDefault(String),

    /// Error raised by a datum codec while encoding or decoding.
    #[error("Codec Error: {0}")]
    Codec(String),

    /// Logical type registration or conversion failure.
    #[error("Logical Type Error: {0}")]
    LogicalType(String),
}

fn fragment_suffix(fragment: &Option<String>) -> String {
    match fragment {
        Some(fragment) => format!(" in {}", fragment),
        None => String::new(),
    }
}

impl Error {
    /// Creates a parse error without a fragment.
    pub fn parse(message: impl Into<String>) -> Self {
        Error::SchemaParse {
            message: message.into(),
            fragment: None,
        }
    }

    /// Creates a parse error pointing at the offending JSON fragment.
    pub fn parse_at(message: impl Into<String>, fragment: &serde_json::Value) -> Self {
        Error::SchemaParse {
            message: message.into(),
            fragment: Some(fragment.to_string()),
        }
    }

    /// Creates a validation error without a fragment.
    pub fn validation(message: impl Into<String>) -> Self {
        Error::SchemaValidation {
            message: message.into(),
            fragment: None,
        }
    }

    /// Creates a validation error pointing at the offending JSON fragment.
    pub fn validation_at(message: impl Into<String>, fragment: &serde_json::Value) -> Self {
        Error::SchemaValidation {
            message: message.into(),
            fragment: Some(fragment.to_string()),
        }
    }

    /// Attaches a fragment to a compile error that does not carry one yet.
    pub fn with_fragment(self, at: &serde_json::Value) -> Self {
        match self {
            Error::SchemaParse {
                message,
                fragment: None,
            } => Error::parse_at(message, at),
            Error::SchemaValidation {
                message,
                fragment: None,
            } => Error::validation_at(message, at),
            other => other,
        }
    }

    /// Returns true for the two compile-time categories.
    pub fn is_compile_error(&self) -> bool {
        matches!(self, Error::SchemaParse { .. } | Error::SchemaValidation { .. })
    }
}

/// A specialized `Result` type for schemata operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        // Only codecs touch byte streams.
        Error::Codec(format!("IO Error during codec operation: {}", err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SchemaParse {
            message: format!("invalid JSON: {}", err),
            fragment: None,
        }
    }
}
