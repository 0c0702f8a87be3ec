use std::{fmt, str::FromStr};

use binobj_error::TextError;

/// Тип поля: выбирает кодек для байтов значения.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldType {
    BinHex,
    Boolean,
    UInt8,
    Int8,
    UInt16,
    Int16,
    UInt32,
    Int32,
    UInt64,
    Int64,
    Float,
    Vector2,
    Vector3,
    Vector4,
    String,
    Enum,
    StringId,
    NoCaseStringId,
    PathId,
    StringId64,
    NoCaseStringId64,
    PathId64,
    Rml,
    Array32,
}

impl FieldType {
    pub const ALL: [FieldType; 24] = [
        Self::BinHex,
        Self::Boolean,
        Self::UInt8,
        Self::Int8,
        Self::UInt16,
        Self::Int16,
        Self::UInt32,
        Self::Int32,
        Self::UInt64,
        Self::Int64,
        Self::Float,
        Self::Vector2,
        Self::Vector3,
        Self::Vector4,
        Self::String,
        Self::Enum,
        Self::StringId,
        Self::NoCaseStringId,
        Self::PathId,
        Self::StringId64,
        Self::NoCaseStringId64,
        Self::PathId64,
        Self::Rml,
        Self::Array32,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::BinHex => "BinHex",
            Self::Boolean => "Boolean",
            Self::UInt8 => "UInt8",
            Self::Int8 => "Int8",
            Self::UInt16 => "UInt16",
            Self::Int16 => "Int16",
            Self::UInt32 => "UInt32",
            Self::Int32 => "Int32",
            Self::UInt64 => "UInt64",
            Self::Int64 => "Int64",
            Self::Float => "Float",
            Self::Vector2 => "Vector2",
            Self::Vector3 => "Vector3",
            Self::Vector4 => "Vector4",
            Self::String => "String",
            Self::Enum => "Enum",
            Self::StringId => "StringId",
            Self::NoCaseStringId => "NoCaseStringId",
            Self::PathId => "PathId",
            Self::StringId64 => "StringId64",
            Self::NoCaseStringId64 => "NoCaseStringId64",
            Self::PathId64 => "PathId64",
            Self::Rml => "Rml",
            Self::Array32 => "Array32",
        }
    }

    /// Может ли тип быть элементом `Array32`.
    pub fn is_array_element(self) -> bool {
        !matches!(self, Self::BinHex | Self::Rml | Self::Array32)
    }
}

impl fmt::Display for FieldType {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FieldType {
    type Err = TextError;

    /// Регистр не важен; `Float32` принимается как синоним `Float`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("Float32") {
            return Ok(Self::Float);
        }
        Self::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| TextError::UnknownFieldType {
                name: s.to_string(),
            })
    }
}
