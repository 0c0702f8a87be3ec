//! Field codecs.
//!
//! Значение поля в документе хранится как непрозрачные байты; тип поля из
//! схемы выбирает обработчик, который переводит эти байты в типизированное
//! значение, в текст и обратно. Все обработчики собраны в реестре
//! [`FieldCodecRegistry`], общий экземпляр которого возвращает [`registry`].

pub mod array;
pub mod binhex;
pub mod boolean;
pub mod enums;
pub mod float;
pub mod ids;
pub mod ints;
pub mod registry;
pub mod rml;
pub mod string;
pub mod types;
pub mod value;
pub mod vector;

pub use registry::{registry, FieldCodecRegistry, FieldHandler, FieldSpec};
pub use types::FieldType;
pub use value::FieldValue;
