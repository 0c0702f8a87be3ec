use binobj_error::{BinobjResult, FieldError};

use super::{
    float::{parse_f32, read_f32},
    registry::take,
    FieldHandler, FieldSpec, FieldType, FieldValue,
};

/// Вектор из 2, 3 или 4 чисел `f32`. Текстовая форма: компоненты через
/// запятую.
#[derive(Debug, Clone, Copy)]
pub struct VectorHandler {
    field_type: FieldType,
    arity: usize,
}

impl VectorHandler {
    pub fn with_arity(arity: usize) -> Option<Self> {
        let field_type = match arity {
            2 => FieldType::Vector2,
            3 => FieldType::Vector3,
            4 => FieldType::Vector4,
            _ => return None,
        };
        Some(Self { field_type, arity })
    }

    fn components<'v>(
        &self,
        value: &'v FieldValue,
    ) -> Result<&'v [f32], FieldError> {
        match value {
            FieldValue::Vector(c) if c.len() == self.arity => Ok(c),
            FieldValue::Vector(c) => Err(FieldError::invalid_value(
                self.field_type,
                format!("expected {} components, got {}", self.arity, c.len()),
            )),
            other => Err(FieldError::value_mismatch(self.field_type, other.kind())),
        }
    }
}

impl FieldHandler for VectorHandler {
    fn field_type(&self) -> FieldType {
        self.field_type
    }

    fn parse(
        &self,
        _spec: &FieldSpec<'_>,
        text: &str,
    ) -> BinobjResult<FieldValue> {
        let components = text
            .split(',')
            .map(|part| parse_f32(self.field_type, part))
            .collect::<Result<Vec<_>, _>>()?;
        if components.len() != self.arity {
            return Err(FieldError::parse(
                self.field_type,
                text,
                format!("expected {} components", self.arity),
            )
            .into());
        }
        Ok(FieldValue::Vector(components))
    }

    fn compose(
        &self,
        _spec: &FieldSpec<'_>,
        value: &FieldValue,
    ) -> BinobjResult<String> {
        let parts: Vec<String> = self
            .components(value)?
            .iter()
            .map(f32::to_string)
            .collect();
        Ok(parts.join(","))
    }

    fn serialize(
        &self,
        _spec: &FieldSpec<'_>,
        value: &FieldValue,
    ) -> BinobjResult<Vec<u8>> {
        Ok(self
            .components(value)?
            .iter()
            .flat_map(|c| c.to_le_bytes())
            .collect())
    }

    /// Нужно не меньше `4 * arity` байт; потребляется ровно столько.
    fn deserialize(
        &self,
        _spec: &FieldSpec<'_>,
        bytes: &[u8],
    ) -> BinobjResult<(FieldValue, usize)> {
        let len = 4 * self.arity;
        let bytes = take(self.field_type, bytes, len)?;
        let components = bytes.chunks_exact(4).map(read_f32).collect();
        Ok((FieldValue::Vector(components), len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector3_bytes() {
        let h = VectorHandler::with_arity(3).unwrap();
        let spec = FieldSpec::default();
        let value = FieldValue::Vector(vec![1.0, -2.0, 0.5]);
        let bytes = h.serialize(&spec, &value).unwrap();
        assert_eq!(bytes.len(), 12);
        assert_eq!(h.deserialize(&spec, &bytes).unwrap(), (value, 12));
        assert!(h.deserialize(&spec, &bytes[..11]).is_err());
    }

    #[test]
    fn test_vector_consumes_prefix_only() {
        let h = VectorHandler::with_arity(2).unwrap();
        let (_, consumed) = h.deserialize(&FieldSpec::default(), &[0u8; 10]).unwrap();
        assert_eq!(consumed, 8);
    }

    #[test]
    fn test_vector_text() {
        let h = VectorHandler::with_arity(2).unwrap();
        let spec = FieldSpec::default();
        let v = h.parse(&spec, "1.5, 2").unwrap();
        assert_eq!(v, FieldValue::Vector(vec![1.5, 2.0]));
        assert_eq!(h.compose(&spec, &v).unwrap(), "1.5,2");
        assert!(h.parse(&spec, "1,2,3").is_err());
        assert!(h
            .serialize(&spec, &FieldValue::Vector(vec![1.0]))
            .is_err());
    }

    #[test]
    fn test_only_known_arities() {
        assert!(VectorHandler::with_arity(1).is_none());
        assert!(VectorHandler::with_arity(5).is_none());
    }
}
