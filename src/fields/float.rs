use binobj_error::{BinobjResult, FieldError};

use super::{registry::take, FieldHandler, FieldSpec, FieldType, FieldValue};

/// 32-битное число с плавающей точкой, little-endian. Пустое значение
/// читается как `0.0`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FloatHandler;

pub(crate) fn parse_f32(
    field_type: FieldType,
    text: &str,
) -> Result<f32, FieldError> {
    text.trim()
        .parse::<f32>()
        .map_err(|e| FieldError::parse(field_type, text, e.to_string()))
}

pub(crate) fn read_f32(bytes: &[u8]) -> f32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[..4]);
    f32::from_le_bytes(buf)
}

fn as_f32(value: &FieldValue) -> Result<f32, FieldError> {
    match value {
        FieldValue::Float(v) => Ok(*v),
        other => Err(FieldError::value_mismatch(FieldType::Float, other.kind())),
    }
}

impl FieldHandler for FloatHandler {
    fn field_type(&self) -> FieldType {
        FieldType::Float
    }

    fn parse(
        &self,
        _spec: &FieldSpec<'_>,
        text: &str,
    ) -> BinobjResult<FieldValue> {
        Ok(FieldValue::Float(parse_f32(FieldType::Float, text)?))
    }

    fn compose(
        &self,
        _spec: &FieldSpec<'_>,
        value: &FieldValue,
    ) -> BinobjResult<String> {
        Ok(as_f32(value)?.to_string())
    }

    fn serialize(
        &self,
        _spec: &FieldSpec<'_>,
        value: &FieldValue,
    ) -> BinobjResult<Vec<u8>> {
        Ok(as_f32(value)?.to_le_bytes().to_vec())
    }

    fn deserialize(
        &self,
        _spec: &FieldSpec<'_>,
        bytes: &[u8],
    ) -> BinobjResult<(FieldValue, usize)> {
        match bytes.len() {
            0 => Ok((FieldValue::Float(0.0), 0)),
            4 => Ok((FieldValue::Float(read_f32(bytes)), 4)),
            n => Err(FieldError::bad_size(FieldType::Float, n).into()),
        }
    }

    fn deserialize_element(
        &self,
        _spec: &FieldSpec<'_>,
        bytes: &[u8],
    ) -> BinobjResult<(FieldValue, usize)> {
        let bytes = take(FieldType::Float, bytes, 4)?;
        Ok((FieldValue::Float(read_f32(bytes)), 4))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_sizes() {
        let h = FloatHandler;
        let spec = FieldSpec::default();
        assert_eq!(h.deserialize(&spec, &[]).unwrap(), (FieldValue::Float(0.0), 0));
        let bytes = h.serialize(&spec, &FieldValue::Float(1.5)).unwrap();
        assert_eq!(bytes, 1.5f32.to_le_bytes().to_vec());
        assert_eq!(h.deserialize(&spec, &bytes).unwrap(), (FieldValue::Float(1.5), 4));
        assert!(h.deserialize(&spec, &[0, 0]).is_err());
    }

    #[test]
    fn test_float_text() {
        let h = FloatHandler;
        let spec = FieldSpec::default();
        assert_eq!(h.parse(&spec, " -0.25 ").unwrap(), FieldValue::Float(-0.25));
        assert_eq!(h.compose(&spec, &FieldValue::Float(0.1)).unwrap(), "0.1");
        assert!(h.parse(&spec, "abc").is_err());
    }
}
