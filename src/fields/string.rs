use binobj_error::{BinobjResult, FieldError};

use super::{FieldHandler, FieldSpec, FieldType, FieldValue};

/// UTF-8 строка с завершающим нулём.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringHandler;

fn as_str(value: &FieldValue) -> Result<&str, FieldError> {
    match value {
        FieldValue::String(s) => Ok(s),
        other => Err(FieldError::value_mismatch(FieldType::String, other.kind())),
    }
}

impl FieldHandler for StringHandler {
    fn field_type(&self) -> FieldType {
        FieldType::String
    }

    fn parse(
        &self,
        _spec: &FieldSpec<'_>,
        text: &str,
    ) -> BinobjResult<FieldValue> {
        Ok(FieldValue::String(text.to_string()))
    }

    fn compose(
        &self,
        _spec: &FieldSpec<'_>,
        value: &FieldValue,
    ) -> BinobjResult<String> {
        Ok(as_str(value)?.to_string())
    }

    fn serialize(
        &self,
        _spec: &FieldSpec<'_>,
        value: &FieldValue,
    ) -> BinobjResult<Vec<u8>> {
        let s = as_str(value)?;
        if s.contains('\0') {
            return Err(FieldError::invalid_value(
                FieldType::String,
                "string contains an embedded NUL",
            )
            .into());
        }
        let mut out = Vec::with_capacity(s.len() + 1);
        out.extend_from_slice(s.as_bytes());
        out.push(0);
        Ok(out)
    }

    fn deserialize(
        &self,
        _spec: &FieldSpec<'_>,
        bytes: &[u8],
    ) -> BinobjResult<(FieldValue, usize)> {
        let end = bytes.iter().position(|&b| b == 0).ok_or_else(|| {
            FieldError::invalid_value(FieldType::String, "missing NUL terminator")
        })?;
        let s = std::str::from_utf8(&bytes[..end])
            .map_err(|e| FieldError::invalid_value(FieldType::String, e.to_string()))?;
        Ok((FieldValue::String(s.to_string()), end + 1))
    }
}
