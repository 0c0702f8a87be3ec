use std::any::Any;

use thiserror::Error;

use crate::{ErrorExt, StatusCode};

/// Ошибки кодеков значений полей.
///
/// Тип поля хранится строкой, чтобы крейт ошибок не зависел от перечня
/// типов основного крейта.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("failed to parse {field_type} from '{text}': {reason}")]
    Parse {
        field_type: String,
        text: String,
        reason: String,
    },

    #[error("bad size {size} for {field_type}")]
    BadSize { field_type: String, size: usize },

    #[error("invalid {field_type} value: {reason}")]
    InvalidValue { field_type: String, reason: String },

    #[error("{operation} is not supported for {field_type}")]
    NotSupported {
        field_type: String,
        operation: String,
    },

    #[error("{field_type} handler cannot encode a {value_kind} value")]
    ValueMismatch {
        field_type: String,
        value_kind: String,
    },

    #[error("did not consume all data for field '{field}' (read {read}, total {total})")]
    Incomplete {
        field: String,
        read: usize,
        total: usize,
    },
}

impl FieldError {
    pub fn parse(
        field_type: impl ToString,
        text: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Parse {
            field_type: field_type.to_string(),
            text: text.into(),
            reason: reason.into(),
        }
    }

    pub fn bad_size(
        field_type: impl ToString,
        size: usize,
    ) -> Self {
        Self::BadSize {
            field_type: field_type.to_string(),
            size,
        }
    }

    pub fn invalid_value(
        field_type: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field_type: field_type.to_string(),
            reason: reason.into(),
        }
    }

    pub fn not_supported(
        field_type: impl ToString,
        operation: impl Into<String>,
    ) -> Self {
        Self::NotSupported {
            field_type: field_type.to_string(),
            operation: operation.into(),
        }
    }

    pub fn value_mismatch(
        field_type: impl ToString,
        value_kind: impl Into<String>,
    ) -> Self {
        Self::ValueMismatch {
            field_type: field_type.to_string(),
            value_kind: value_kind.into(),
        }
    }
}

impl ErrorExt for FieldError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Parse { .. } => StatusCode::ParseError,
            Self::BadSize { .. } => StatusCode::DecodingError,
            Self::InvalidValue { .. } => StatusCode::InvalidValue,
            Self::NotSupported { .. } => StatusCode::Unsupported,
            Self::ValueMismatch { .. } => StatusCode::TypeError,
            Self::Incomplete { .. } => StatusCode::CorruptedData,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
