//! Хеш-идентификаторы.
//!
//! Идентификатор хранится как целое: 32-битные так же, как `Int32`,
//! 64-битные так же, как `Int64`. Текст `0x...` разбирается как
//! шестнадцатеричное значение, любой другой текст хешируется функцией,
//! соответствующей типу.

use binobj_error::{BinobjResult, FieldError};

use super::{
    ints::{check_packed_len, sign_extend, signed_width},
    registry::take,
    FieldHandler, FieldSpec, FieldType, FieldValue,
};
use crate::hashing;

#[derive(Debug, Clone, Copy)]
enum IdHash {
    Narrow(fn(&str) -> u32),
    Wide(fn(&str) -> u64),
}

#[derive(Debug, Clone, Copy)]
pub struct IdHandler {
    field_type: FieldType,
    hash: IdHash,
}

impl IdHandler {
    pub fn for_type(field_type: FieldType) -> Option<Self> {
        let hash = match field_type {
            FieldType::StringId => IdHash::Narrow(hashing::string_id),
            FieldType::NoCaseStringId => IdHash::Narrow(hashing::no_case_string_id),
            FieldType::PathId => IdHash::Narrow(hashing::path_id),
            FieldType::StringId64 => IdHash::Wide(hashing::string_id64),
            FieldType::NoCaseStringId64 => IdHash::Wide(hashing::no_case_string_id64),
            FieldType::PathId64 => IdHash::Wide(hashing::path_id64),
            _ => return None,
        };
        Some(Self { field_type, hash })
    }

    fn width(&self) -> usize {
        match self.hash {
            IdHash::Narrow(_) => 4,
            IdHash::Wide(_) => 8,
        }
    }

    /// Значение как знаковое число той ширины, которой оно пишется.
    fn signed(
        &self,
        value: &FieldValue,
    ) -> Result<i64, FieldError> {
        match (value, self.hash) {
            (&FieldValue::Id32(v), IdHash::Narrow(_)) => Ok(v as i32 as i64),
            (&FieldValue::Id64(v), IdHash::Wide(_)) => Ok(v as i64),
            (other, _) => Err(FieldError::value_mismatch(self.field_type, other.kind())),
        }
    }

    fn value_from(
        &self,
        bytes: &[u8],
    ) -> FieldValue {
        let v = sign_extend(bytes);
        match self.hash {
            IdHash::Narrow(_) => FieldValue::Id32(v as u32),
            IdHash::Wide(_) => FieldValue::Id64(v as u64),
        }
    }
}

impl FieldHandler for IdHandler {
    fn field_type(&self) -> FieldType {
        self.field_type
    }

    fn parse(
        &self,
        _spec: &FieldSpec<'_>,
        text: &str,
    ) -> BinobjResult<FieldValue> {
        let trimmed = text.trim();
        let hex = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"));
        let value = match (hex, self.hash) {
            (Some(hex), IdHash::Narrow(_)) => FieldValue::Id32(
                u32::from_str_radix(hex, 16)
                    .map_err(|e| FieldError::parse(self.field_type, text, e.to_string()))?,
            ),
            (Some(hex), IdHash::Wide(_)) => FieldValue::Id64(
                u64::from_str_radix(hex, 16)
                    .map_err(|e| FieldError::parse(self.field_type, text, e.to_string()))?,
            ),
            (None, IdHash::Narrow(hash)) => FieldValue::Id32(hash(text)),
            (None, IdHash::Wide(hash)) => FieldValue::Id64(hash(text)),
        };
        Ok(value)
    }

    fn compose(
        &self,
        _spec: &FieldSpec<'_>,
        value: &FieldValue,
    ) -> BinobjResult<String> {
        match (value, self.hash) {
            (FieldValue::Id32(v), IdHash::Narrow(_)) => Ok(format!("0x{v:08X}")),
            (FieldValue::Id64(v), IdHash::Wide(_)) => Ok(format!("0x{v:016X}")),
            (other, _) => Err(FieldError::value_mismatch(self.field_type, other.kind()).into()),
        }
    }

    fn serialize(
        &self,
        _spec: &FieldSpec<'_>,
        value: &FieldValue,
    ) -> BinobjResult<Vec<u8>> {
        let v = self.signed(value)?;
        Ok(v.to_le_bytes()[..signed_width(v)].to_vec())
    }

    fn deserialize(
        &self,
        _spec: &FieldSpec<'_>,
        bytes: &[u8],
    ) -> BinobjResult<(FieldValue, usize)> {
        check_packed_len(self.field_type, bytes.len(), self.width())?;
        Ok((self.value_from(bytes), bytes.len()))
    }

    fn serialize_element(
        &self,
        _spec: &FieldSpec<'_>,
        value: &FieldValue,
    ) -> BinobjResult<Vec<u8>> {
        let v = self.signed(value)?;
        Ok(v.to_le_bytes()[..self.width()].to_vec())
    }

    fn deserialize_element(
        &self,
        _spec: &FieldSpec<'_>,
        bytes: &[u8],
    ) -> BinobjResult<(FieldValue, usize)> {
        let width = self.width();
        let bytes = take(self.field_type, bytes, width)?;
        Ok((self.value_from(bytes), width))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler(ty: FieldType) -> IdHandler {
        IdHandler::for_type(ty).unwrap()
    }

    #[test]
    fn test_hex_and_hashed_text() {
        let spec = FieldSpec::default();
        let h = handler(FieldType::StringId);
        assert_eq!(h.parse(&spec, "0x0000ABCD").unwrap(), FieldValue::Id32(0xABCD));
        assert_eq!(
            h.parse(&spec, "Widget").unwrap(),
            FieldValue::Id32(hashing::crc32("Widget"))
        );
        assert_eq!(h.compose(&spec, &FieldValue::Id32(0xABCD)).unwrap(), "0x0000ABCD");
    }

    #[test]
    fn test_hash_flavours() {
        let spec = FieldSpec::default();
        let no_case = handler(FieldType::NoCaseStringId);
        assert_eq!(
            no_case.parse(&spec, "WIDGET").unwrap(),
            no_case.parse(&spec, "widget").unwrap()
        );
        let path = handler(FieldType::PathId);
        assert_eq!(
            path.parse(&spec, "Data/Maps/A.bin").unwrap(),
            path.parse(&spec, "data\\maps\\a.bin").unwrap()
        );
        let wide = handler(FieldType::StringId64);
        assert_eq!(
            wide.parse(&spec, "a").unwrap(),
            FieldValue::Id64(hashing::fnv1a64("a"))
        );
    }

    #[test]
    fn test_signed_packing() {
        let spec = FieldSpec::default();
        let h = handler(FieldType::StringId);
        // 0xFFFFFFFF как Int32 равно -1 и помещается в один байт.
        let bytes = h.serialize(&spec, &FieldValue::Id32(u32::MAX)).unwrap();
        assert_eq!(bytes, vec![0xFF]);
        assert_eq!(h.deserialize(&spec, &bytes).unwrap(), (FieldValue::Id32(u32::MAX), 1));

        let bytes = h.serialize(&spec, &FieldValue::Id32(0x1234_5678)).unwrap();
        assert_eq!(bytes.len(), 4);
        assert!(h.deserialize(&spec, &[0; 8]).is_err());
    }

    #[test]
    fn test_wide_compose() {
        let h = handler(FieldType::PathId64);
        assert_eq!(
            h.compose(&FieldSpec::default(), &FieldValue::Id64(0xAB)).unwrap(),
            "0x00000000000000AB"
        );
        assert!(h
            .compose(&FieldSpec::default(), &FieldValue::Id32(1))
            .is_err());
    }
}
