use binobj_error::{BinobjResult, FieldError};

use super::{ints::parse_integer, registry::take, FieldHandler, FieldSpec, FieldType, FieldValue};

/// Перечисление: 4-байтовое знаковое число. В тексте используется имя
/// элемента, если поле объявляет перечисление и значение в нём есть, иначе
/// десятичное число.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnumHandler;

fn as_i32(value: &FieldValue) -> Result<i32, FieldError> {
    match value {
        FieldValue::Enum(v) => Ok(*v),
        FieldValue::Int(v) => i32::try_from(*v)
            .map_err(|_| FieldError::invalid_value(FieldType::Enum, format!("{v} is out of range"))),
        other => Err(FieldError::value_mismatch(FieldType::Enum, other.kind())),
    }
}

impl FieldHandler for EnumHandler {
    fn field_type(&self) -> FieldType {
        FieldType::Enum
    }

    fn parse(
        &self,
        spec: &FieldSpec<'_>,
        text: &str,
    ) -> BinobjResult<FieldValue> {
        if let Some(v) = spec.enumeration.and_then(|e| e.value_of(text.trim())) {
            return Ok(FieldValue::Enum(v));
        }
        let reason = if spec.enumeration.is_some() {
            "not an element name or an integer"
        } else {
            "no enum definition and not an integer"
        };
        let v = parse_integer(FieldType::Enum, text)
            .ok()
            .and_then(|v| i32::try_from(v).ok())
            .ok_or_else(|| FieldError::parse(FieldType::Enum, text, reason))?;
        Ok(FieldValue::Enum(v))
    }

    fn compose(
        &self,
        spec: &FieldSpec<'_>,
        value: &FieldValue,
    ) -> BinobjResult<String> {
        let v = as_i32(value)?;
        Ok(spec
            .enumeration
            .and_then(|e| e.name_of(v))
            .map(str::to_string)
            .unwrap_or_else(|| v.to_string()))
    }

    fn serialize(
        &self,
        _spec: &FieldSpec<'_>,
        value: &FieldValue,
    ) -> BinobjResult<Vec<u8>> {
        Ok(as_i32(value)?.to_le_bytes().to_vec())
    }

    fn deserialize(
        &self,
        _spec: &FieldSpec<'_>,
        bytes: &[u8],
    ) -> BinobjResult<(FieldValue, usize)> {
        let b = take(FieldType::Enum, bytes, 4)?;
        Ok((FieldValue::Enum(i32::from_le_bytes([b[0], b[1], b[2], b[3]])), 4))
    }
}
