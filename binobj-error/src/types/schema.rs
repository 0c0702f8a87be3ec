use std::any::Any;

use thiserror::Error;

use crate::{ErrorExt, StatusCode};

/// Ошибки загрузки схемы классов.
///
/// Любая из них прерывает построение схемы целиком.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("duplicate class '{name}'")]
    DuplicateClass { name: String },

    #[error("duplicate field '{field}' in class '{class}'")]
    DuplicateField { class: String, field: String },

    #[error("duplicate object '{object}' in class '{class}'")]
    DuplicateObject { class: String, object: String },

    #[error("duplicate enum element name '{element}' in field '{field}'")]
    DuplicateEnumName { field: String, element: String },

    #[error("duplicate enum element value {value} in field '{field}'")]
    DuplicateEnumValue { field: String, value: i32 },

    #[error("hash mismatch for '{name}': declared 0x{declared:08X}, computed 0x{computed:08X}")]
    HashMismatch {
        name: String,
        declared: u32,
        computed: u32,
    },

    #[error("{what} has neither a name nor a hash")]
    MissingIdentity { what: String },

    #[error("could not find object '{friend}' referenced by '{class}'")]
    UnresolvedFriend { class: String, friend: String },

    #[error("duplicate object file alias '{alias}'")]
    DuplicateAlias { alias: String },

    #[error("field '{field}' of type {field_type} cannot have an array element type")]
    ArrayTypeMisuse { field: String, field_type: String },

    #[error("invalid predicate on friend of '{class}': {reason}")]
    InvalidPredicate { class: String, reason: String },

    #[error("invalid value '{value}' for attribute '{attribute}': {reason}")]
    InvalidAttribute {
        attribute: String,
        value: String,
        reason: String,
    },

    #[error("failed to load '{path}': {reason}")]
    Source { path: String, reason: String },
}

impl ErrorExt for SchemaError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::DuplicateClass { .. }
            | Self::DuplicateField { .. }
            | Self::DuplicateObject { .. }
            | Self::DuplicateEnumName { .. }
            | Self::DuplicateEnumValue { .. }
            | Self::DuplicateAlias { .. } => StatusCode::DuplicateDefinition,
            Self::HashMismatch { .. } => StatusCode::HashMismatch,
            Self::UnresolvedFriend { .. } => StatusCode::UnresolvedReference,
            _ => StatusCode::SchemaLoad,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
