use crate::rml::RmlDocument;

/// Типизированное значение поля.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Boolean(bool),
    Int(i64),
    UInt(u64),
    Float(f32),
    Vector(Vec<f32>),
    String(String),
    Enum(i32),
    Id32(u32),
    Id64(u64),
    Bytes(Vec<u8>),
    Rml(RmlDocument),
    Array(Vec<FieldValue>),
}

impl FieldValue {
    /// Короткое имя варианта для сообщений об ошибках.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Boolean(_) => "boolean",
            Self::Int(_) => "signed integer",
            Self::UInt(_) => "unsigned integer",
            Self::Float(_) => "float",
            Self::Vector(_) => "vector",
            Self::String(_) => "string",
            Self::Enum(_) => "enum",
            Self::Id32(_) => "32-bit id",
            Self::Id64(_) => "64-bit id",
            Self::Bytes(_) => "bytes",
            Self::Rml(_) => "rml",
            Self::Array(_) => "array",
        }
    }
}
