use binobj_error::{BinobjResult, FieldError};

use super::{FieldHandler, FieldSpec, FieldType, FieldValue};
use crate::text::TextNode;

/// Сырые байты. Используется для полей без определения в схеме. Текстовая
/// форма: шестнадцатеричная строка в верхнем регистре, пробелы при разборе
/// игнорируются.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinHexHandler;

pub(crate) fn decode_hex(text: &str) -> Result<Vec<u8>, FieldError> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    hex::decode(&compact).map_err(|e| FieldError::parse(FieldType::BinHex, text, e.to_string()))
}

impl FieldHandler for BinHexHandler {
    fn field_type(&self) -> FieldType {
        FieldType::BinHex
    }

    fn serialize(
        &self,
        _spec: &FieldSpec<'_>,
        value: &FieldValue,
    ) -> BinobjResult<Vec<u8>> {
        match value {
            FieldValue::Bytes(b) => Ok(b.clone()),
            other => Err(FieldError::value_mismatch(FieldType::BinHex, other.kind()).into()),
        }
    }

    fn deserialize(
        &self,
        _spec: &FieldSpec<'_>,
        bytes: &[u8],
    ) -> BinobjResult<(FieldValue, usize)> {
        Ok((FieldValue::Bytes(bytes.to_vec()), bytes.len()))
    }

    fn serialize_element(
        &self,
        _spec: &FieldSpec<'_>,
        _value: &FieldValue,
    ) -> BinobjResult<Vec<u8>> {
        Err(FieldError::not_supported(FieldType::BinHex, "array element").into())
    }

    fn deserialize_element(
        &self,
        _spec: &FieldSpec<'_>,
        _bytes: &[u8],
    ) -> BinobjResult<(FieldValue, usize)> {
        Err(FieldError::not_supported(FieldType::BinHex, "array element").into())
    }

    fn import(
        &self,
        _spec: &FieldSpec<'_>,
        node: &TextNode,
    ) -> BinobjResult<Vec<u8>> {
        Ok(decode_hex(&node.text)?)
    }

    fn export(
        &self,
        _spec: &FieldSpec<'_>,
        bytes: &[u8],
        out: &mut TextNode,
    ) -> BinobjResult<usize> {
        out.text = hex::encode_upper(bytes);
        Ok(bytes.len())
    }
}
