use std::path::PathBuf;

use thiserror::Error;

/// Everything that aborts a generation run.
///
/// Each variant names the struct, call or field it was raised for, so the
/// orchestrator can report it as a single diagnostic.
#[derive(Error, Debug)]
pub enum GenError {
    #[error("unknown type '{kind}' ({context})")]
    UnknownType { kind: String, context: String },

    #[error("unsupported casing '{casing}' for {class} identifiers; valid: {valid}")]
    UnsupportedCasing {
        casing: String,
        class: String,
        valid: String,
    },

    #[error("invalid wrap '{wrap}' for {class} identifiers; expected 'prefix|suffix'")]
    InvalidWrap { wrap: String, class: String },

    #[error("cannot parse {key} constraint {value} ({context}): {reason}")]
    ConstraintParse {
        key: String,
        value: String,
        context: String,
        reason: String,
    },

    #[error("reference '{reference}' not found ({context}): no {missing}")]
    ReferenceNotFound {
        reference: String,
        context: String,
        missing: String,
    },

    #[error("type mismatch on '{reference}' ({context}): expected {expected}, found {found}")]
    TypeMismatch {
        reference: String,
        context: String,
        expected: String,
        found: String,
    },

    #[error("duplicate signature '{signature}' on calls '{first}' and '{second}'")]
    DuplicateSignature {
        signature: String,
        first: String,
        second: String,
    },

    #[error("invalid model ({context}): {reason}")]
    InvalidModel { context: String, reason: String },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Raised once some targets were already replaced, so the destination
    /// mixes new and earlier output.
    #[error("{}: {source} ({written} of {total} files already replaced)", path.display())]
    PartialWrite {
        path: PathBuf,
        written: usize,
        total: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("formatting failed")]
    Fmt(#[from] std::fmt::Error),
}

pub type Result<T, E = GenError> = std::result::Result<T, E>;

impl GenError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GenError::Io {
            path: path.into(),
            source,
        }
    }
}
