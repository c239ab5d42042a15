//! Error kinds for every stage: schema build, encode, decode, text.
//!
//! Nothing in the crate recovers locally; each error carries enough context
//! (record and field name) to find the offending declaration or value.
use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

use crate::types::Wrapper;

// ------------------------------ Schema build ------------------------------ //

/// Why a single field declaration could not be resolved.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("unknown type name `{0}`")]
    UnknownName(String),
    #[error("type name `{0}` is registered for more than one type")]
    AmbiguousName(String),
    #[error("`{wrapper}` with {arity} type parameters is not supported")]
    UnsupportedGeneric { wrapper: Wrapper, arity: usize },
    #[error("union of {arity} variants is not supported; only single-type optionals are")]
    UnsupportedUnion { arity: usize },
    #[error("`{wrapper}` expects exactly one type parameter, got {arity}")]
    Arity { wrapper: Wrapper, arity: usize },
    #[error("collection elements cannot themselves be collections (`{wrapper}` inside a collection)")]
    NestedCollection { wrapper: Wrapper },
}

#[derive(Debug, Error)]
pub enum SchemaBuildError {
    #[error("cannot resolve field `{record}.{field}`: {source}")]
    Field {
        record: &'static str,
        field: &'static str,
        #[source]
        source: ResolveError,
    },
    #[error("record `{record}` declares field `{field}` twice")]
    DuplicateField {
        record: &'static str,
        field: &'static str,
    },
}

// -------------------------------- Values ---------------------------------- //

/// Error raised by a scalar conversion: a user converter or a built-in
/// coercion.
#[derive(Debug)]
pub struct ConvertError(Box<dyn StdError + Send + Sync>);

impl ConvertError {
    pub fn new(error: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self(error.into())
    }

    pub fn into_inner(self) -> Box<dyn StdError + Send + Sync> {
        self.0
    }
}

impl fmt::Display for ConvertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl StdError for ConvertError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.0.source()
    }
}

/// Failure while rebuilding a typed value from decoded parts.
#[derive(Debug, Error)]
pub enum ConstructError {
    #[error("missing field `{field}` of `{record}`")]
    MissingField {
        record: &'static str,
        field: &'static str,
    },
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    #[error("value {value} is out of range for {ty}")]
    OutOfRange { ty: &'static str, value: i128 },
    #[error("field `{field}`: {source}")]
    Field {
        field: &'static str,
        #[source]
        source: Box<ConstructError>,
    },
    #[error("{0}")]
    Custom(String),
}

impl ConstructError {
    pub fn mismatch(expected: &'static str, found: &'static str) -> Self {
        Self::TypeMismatch { expected, found }
    }

    pub(crate) fn in_field(self, field: &'static str) -> Self {
        Self::Field { field, source: Box::new(self) }
    }
}

// ------------------------------ Encode/Decode ----------------------------- //

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("record type `{0}` is not part of this schema")]
    UnknownRecord(&'static str),
    #[error("record `{record}` does not expose declared field `{field}`")]
    MissingField {
        record: &'static str,
        field: &'static str,
    },
    #[error("field `{record}.{field}`: expected {expected}, found {found}")]
    ShapeMismatch {
        record: &'static str,
        field: &'static str,
        expected: &'static str,
        found: &'static str,
    },
    #[error("field `{record}.{field}`: cannot convert element: {source}")]
    Conversion {
        record: &'static str,
        field: &'static str,
        #[source]
        source: ConvertError,
    },
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("record type `{0}` is not part of this schema")]
    UnknownRecord(&'static str),
    #[error("expected a map for record `{record}`, found {found}")]
    ExpectedMap {
        record: &'static str,
        found: &'static str,
    },
    #[error("field `{record}.{field}`: expected a sequence, found {found}")]
    ExpectedSeq {
        record: &'static str,
        field: &'static str,
        found: &'static str,
    },
    /// A resolved converter (field, type, or direct coercion) failed.
    #[error("field `{record}.{field}`: conversion failed: {source}")]
    Conversion {
        record: &'static str,
        field: &'static str,
        #[source]
        source: ConvertError,
    },
    #[error("cannot construct `{record}`: {source}")]
    Construct {
        record: &'static str,
        #[source]
        source: ConstructError,
    },
    #[error("decoded `{found}` where `{expected}` was requested")]
    RootMismatch {
        expected: &'static str,
        found: &'static str,
    },
}

// --------------------------------- Text ----------------------------------- //

#[derive(Debug, Error)]
pub enum TextFormatError {
    #[error("malformed input at {path}: {message}")]
    Syntax { path: String, message: String },
    #[error("no text encoder registered for scalar type `{0}`")]
    Unrenderable(&'static str),
    #[error("non-finite float {0} has no text form")]
    NonFiniteFloat(f64),
    #[error("text encoder for `{type_name}` failed: {source}")]
    Encoder {
        type_name: &'static str,
        #[source]
        source: ConvertError,
    },
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Everything the text surfaces of [`Coder`](crate::Coder) can fail with.
#[derive(Debug, Error)]
pub enum CoderError {
    #[error(transparent)]
    Schema(#[from] SchemaBuildError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Text(#[from] TextFormatError),
}
