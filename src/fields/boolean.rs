use binobj_error::{BinobjResult, FieldError};

use super::{registry::take, FieldHandler, FieldSpec, FieldType, FieldValue};

/// `false` хранится пустым значением, `true` одним байтом `1`. В массиве
/// элемент всегда занимает один байт.
#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanHandler;

fn from_byte(b: u8) -> Result<bool, FieldError> {
    match b {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(FieldError::invalid_value(
            FieldType::Boolean,
            format!("byte 0x{other:02X} is neither 0 nor 1"),
        )),
    }
}

fn as_bool(value: &FieldValue) -> Result<bool, FieldError> {
    match value {
        FieldValue::Boolean(b) => Ok(*b),
        other => Err(FieldError::value_mismatch(FieldType::Boolean, other.kind())),
    }
}

impl FieldHandler for BooleanHandler {
    fn field_type(&self) -> FieldType {
        FieldType::Boolean
    }

    fn parse(
        &self,
        _spec: &FieldSpec<'_>,
        text: &str,
    ) -> BinobjResult<FieldValue> {
        let t = text.trim();
        if t.eq_ignore_ascii_case("true") {
            Ok(FieldValue::Boolean(true))
        } else if t.eq_ignore_ascii_case("false") {
            Ok(FieldValue::Boolean(false))
        } else {
            Err(FieldError::parse(FieldType::Boolean, text, "expected True or False").into())
        }
    }

    fn compose(
        &self,
        _spec: &FieldSpec<'_>,
        value: &FieldValue,
    ) -> BinobjResult<String> {
        let text = if as_bool(value)? { "True" } else { "False" };
        Ok(text.to_string())
    }

    fn serialize(
        &self,
        _spec: &FieldSpec<'_>,
        value: &FieldValue,
    ) -> BinobjResult<Vec<u8>> {
        Ok(if as_bool(value)? { vec![1] } else { Vec::new() })
    }

    fn deserialize(
        &self,
        _spec: &FieldSpec<'_>,
        bytes: &[u8],
    ) -> BinobjResult<(FieldValue, usize)> {
        match bytes {
            [] => Ok((FieldValue::Boolean(false), 0)),
            [b] => Ok((FieldValue::Boolean(from_byte(*b)?), 1)),
            _ => Err(FieldError::bad_size(FieldType::Boolean, bytes.len()).into()),
        }
    }

    fn serialize_element(
        &self,
        _spec: &FieldSpec<'_>,
        value: &FieldValue,
    ) -> BinobjResult<Vec<u8>> {
        Ok(vec![as_bool(value)? as u8])
    }

    fn deserialize_element(
        &self,
        _spec: &FieldSpec<'_>,
        bytes: &[u8],
    ) -> BinobjResult<(FieldValue, usize)> {
        let b = take(FieldType::Boolean, bytes, 1)?;
        Ok((FieldValue::Boolean(from_byte(b[0])?), 1))
    }
}
