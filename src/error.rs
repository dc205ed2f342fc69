//! Error taxonomy.
//!
//! - [`SchemaError`]: synthesis-time, fatal to the whole run.
//! - [`WireShapeError`]: conversion-time, per call; never touches codec state.
//! - [`LoadError`]: reading schema documents and fixtures.
use thiserror::Error;

use crate::eval::path::FieldPath;
use crate::synth::shape::Shape;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("record `{record}` is declared more than once")]
    DuplicateRecord { record: String },

    #[error("record `{record}` declares field `{field}` more than once")]
    DuplicateField { record: String, field: String },

    #[error("record name `{record}` is not a valid identifier")]
    InvalidRecordName { record: String },

    #[error("no record named `{record}` in schema")]
    MissingRecord { record: String },

    #[error("{record}.{field}: reference to unknown record `{name}`")]
    UnknownRecord { record: String, field: String, name: String },

    #[error("{record}.{field}: union {union} has no members")]
    EmptyUnion { record: String, field: String, union: String },

    #[error("{record}.{field}: union {union} is ambiguous, {shape} values match both {first} and {second}")]
    AmbiguousUnion {
        record: String,
        field: String,
        union: String,
        shape: Shape,
        first: String,
        second: String,
    },

    #[error("enum `{name}` is declared with different values")]
    ConflictingEnum { name: String },

    #[error("{record}.{field}: enum `{name}` has no values")]
    EmptyEnum { record: String, field: String, name: String },

    #[error("{record}.{field}: `{member}` has no literal `{tag}` field to be told apart by")]
    MissingDiscriminant { record: String, field: String, member: String, tag: String },

    #[error("{record}.{field}: {tag} = {literal} is declared by more than one member")]
    DuplicateDiscriminant { record: String, field: String, tag: String, literal: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireShapeError {
    #[error("{path}: missing required field")]
    MissingField { path: FieldPath },

    #[error("{path}: expected {expected}, found {found}")]
    Mismatch { path: FieldPath, expected: String, found: &'static str },

    #[error("{path}: {found} value matches no member of union {union}")]
    NoMatchingArm { path: FieldPath, union: String, found: &'static str },

    #[error("{path}: {value:?} is not a value of enum {name}")]
    NotInEnum { path: FieldPath, name: String, value: String },

    #[error("{path}: {found} selects no member of {union}")]
    UnknownTag { path: FieldPath, union: String, found: String },

    #[error("{path}: timestamp {seconds} is out of range")]
    TimestampOutOfRange { path: FieldPath, seconds: String },

    #[error("{path}: `{name}` is not bound")]
    Unbound { path: FieldPath, name: String },

    #[error("no codec for record `{record}`")]
    UnknownCodec { record: String },
}

impl WireShapeError {
    pub fn path(&self) -> Option<&FieldPath> {
        match self {
            WireShapeError::MissingField { path }
            | WireShapeError::Mismatch { path, .. }
            | WireShapeError::NoMatchingArm { path, .. }
            | WireShapeError::NotInEnum { path, .. }
            | WireShapeError::UnknownTag { path, .. }
            | WireShapeError::TimestampOutOfRange { path, .. }
            | WireShapeError::Unbound { path, .. } => Some(path),
            WireShapeError::UnknownCodec { .. } => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("at JSON path {path} → {message}")]
    Json { path: String, message: String },

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("failed to read {path}: {source}")]
    Io { path: String, #[source] source: std::io::Error },
}
