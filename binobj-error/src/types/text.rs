use std::any::Any;

use thiserror::Error;

use crate::{ErrorExt, StatusCode};

/// Ошибки текстового представления (дерево разметки, импорт).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TextError {
    #[error("malformed markup{}: {reason}", fmt_position(.position))]
    Markup {
        reason: String,
        position: Option<u64>,
    },

    #[error("expected <{expected}>, found <{found}>")]
    UnexpectedElement { expected: String, found: String },

    #[error("<{tag}> has neither a name nor a hash attribute")]
    MissingIdentity { tag: String },

    #[error("<{tag}> is missing the '{attribute}' attribute")]
    MissingAttribute { tag: String, attribute: String },

    #[error("invalid hash '{text}'")]
    InvalidHash { text: String },

    #[error("unknown field type '{name}'")]
    UnknownFieldType { name: String },

    #[error("identity '{name}' (0x{hash:08X}) does not match class hash 0x{expected:08X}")]
    IdentityMismatch {
        name: String,
        hash: u32,
        expected: u32,
    },

    #[error("field '{field}' is declared as {declared} but marked as {actual}")]
    FieldTypeMismatch {
        field: String,
        declared: String,
        actual: String,
    },

    #[error("duplicate field '{field}'")]
    DuplicateField { field: String },

    #[error("failed to load external document '{path}': {reason}")]
    External { path: String, reason: String },

    #[error("failed to write '{path}': {reason}")]
    Output { path: String, reason: String },
}

fn fmt_position(position: &Option<u64>) -> String {
    position.map(|p| format!(" at {p}")).unwrap_or_default()
}

impl ErrorExt for TextError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Markup { .. } => StatusCode::InvalidMarkup,
            Self::UnexpectedElement { .. }
            | Self::MissingIdentity { .. }
            | Self::MissingAttribute { .. } => StatusCode::InvalidData,
            Self::InvalidHash { .. } => StatusCode::ParseError,
            Self::UnknownFieldType { .. } | Self::FieldTypeMismatch { .. } => StatusCode::TypeError,
            Self::IdentityMismatch { .. } => StatusCode::HashMismatch,
            Self::DuplicateField { .. } => StatusCode::AlreadyExists,
            Self::External { .. } | Self::Output { .. } => StatusCode::Io,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
