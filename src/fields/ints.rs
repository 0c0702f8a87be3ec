//! Целые числа.
//!
//! В поле документа число пишется минимальной шириной из 1, 2, 4 или 8 байт
//! (little-endian), достаточной для значения: знаковые типы проверяют
//! знаковый диапазон, беззнаковые беззнаковый. При чтении ширина берётся из
//! длины значения, пустое значение означает ноль. Внутри `Array32` элементы
//! пишутся полной объявленной шириной.

use binobj_error::{BinobjResult, FieldError};

use super::{registry::take, FieldHandler, FieldSpec, FieldType, FieldValue};

#[derive(Debug, Clone, Copy)]
pub struct IntHandler {
    field_type: FieldType,
    /// Объявленная ширина в байтах.
    width: usize,
    signed: bool,
}

impl IntHandler {
    pub fn for_type(field_type: FieldType) -> Option<Self> {
        let (width, signed) = match field_type {
            FieldType::UInt8 => (1, false),
            FieldType::Int8 => (1, true),
            FieldType::UInt16 => (2, false),
            FieldType::Int16 => (2, true),
            FieldType::UInt32 => (4, false),
            FieldType::Int32 => (4, true),
            FieldType::UInt64 => (8, false),
            FieldType::Int64 => (8, true),
            _ => return None,
        };
        Some(Self {
            field_type,
            width,
            signed,
        })
    }

    fn signed_range(&self) -> (i64, i64) {
        match self.width {
            8 => (i64::MIN, i64::MAX),
            w => {
                let half = 1i64 << (w * 8 - 1);
                (-half, half - 1)
            }
        }
    }

    fn unsigned_max(&self) -> u64 {
        match self.width {
            8 => u64::MAX,
            w => (1u64 << (w * 8)) - 1,
        }
    }

    fn check_signed(
        &self,
        v: i64,
    ) -> Result<i64, FieldError> {
        let (min, max) = self.signed_range();
        if (min..=max).contains(&v) {
            Ok(v)
        } else {
            Err(FieldError::invalid_value(
                self.field_type,
                format!("{v} is out of range {min}..={max}"),
            ))
        }
    }

    fn check_unsigned(
        &self,
        v: u64,
    ) -> Result<u64, FieldError> {
        let max = self.unsigned_max();
        if v <= max {
            Ok(v)
        } else {
            Err(FieldError::invalid_value(
                self.field_type,
                format!("{v} is out of range 0..={max}"),
            ))
        }
    }

    /// Значение как 64-битный образ в дополнительном коде, с проверкой
    /// диапазона.
    fn raw_value(
        &self,
        value: &FieldValue,
    ) -> Result<u64, FieldError> {
        match (value, self.signed) {
            (&FieldValue::Int(v), true) => self.check_signed(v).map(|v| v as u64),
            (&FieldValue::UInt(v), false) => self.check_unsigned(v),
            // Неотрицательное знаковое значение подходит беззнаковому типу и
            // наоборот.
            (&FieldValue::Int(v), false) => u64::try_from(v)
                .map_err(|_| {
                    FieldError::invalid_value(self.field_type, format!("{v} is negative"))
                })
                .and_then(|v| self.check_unsigned(v)),
            (&FieldValue::UInt(v), true) => i64::try_from(v)
                .map_err(|_| {
                    FieldError::invalid_value(self.field_type, format!("{v} is out of range"))
                })
                .and_then(|v| self.check_signed(v))
                .map(|v| v as u64),
            _ => Err(FieldError::value_mismatch(self.field_type, value.kind())),
        }
    }

    fn minimal_width(
        &self,
        raw: u64,
    ) -> usize {
        if self.signed {
            signed_width(raw as i64)
        } else {
            unsigned_width(raw)
        }
    }

    fn value_from(
        &self,
        bytes: &[u8],
    ) -> FieldValue {
        if self.signed {
            FieldValue::Int(sign_extend(bytes))
        } else {
            FieldValue::UInt(zero_extend(bytes))
        }
    }
}

pub(crate) fn signed_width(v: i64) -> usize {
    if i8::try_from(v).is_ok() {
        1
    } else if i16::try_from(v).is_ok() {
        2
    } else if i32::try_from(v).is_ok() {
        4
    } else {
        8
    }
}

pub(crate) fn unsigned_width(v: u64) -> usize {
    if v <= u8::MAX as u64 {
        1
    } else if v <= u16::MAX as u64 {
        2
    } else if v <= u32::MAX as u64 {
        4
    } else {
        8
    }
}

/// Little-endian байты (до 8) как знаковое число.
pub(crate) fn sign_extend(bytes: &[u8]) -> i64 {
    let negative = bytes.last().is_some_and(|b| b & 0x80 != 0);
    let mut buf = if negative { [0xFF; 8] } else { [0; 8] };
    buf[..bytes.len()].copy_from_slice(bytes);
    i64::from_le_bytes(buf)
}

pub(crate) fn zero_extend(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf[..bytes.len()].copy_from_slice(bytes);
    u64::from_le_bytes(buf)
}

/// Длина значения поля допустима для упакованного целого шириной до `max`.
pub(crate) fn check_packed_len(
    field_type: FieldType,
    len: usize,
    max: usize,
) -> Result<(), FieldError> {
    match len {
        0 | 1 | 2 | 4 | 8 if len <= max => Ok(()),
        _ => Err(FieldError::bad_size(field_type, len)),
    }
}

/// Разбор целого: десятичное со знаком или шестнадцатеричное с `0x`.
pub(crate) fn parse_integer(
    field_type: FieldType,
    text: &str,
) -> Result<i128, FieldError> {
    let trimmed = text.trim();
    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let magnitude = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) => i128::from_str_radix(hex, 16),
        None => digits.parse::<i128>(),
    }
    .map_err(|e| FieldError::parse(field_type, text, e.to_string()))?;
    Ok(if negative { -magnitude } else { magnitude })
}

impl FieldHandler for IntHandler {
    fn field_type(&self) -> FieldType {
        self.field_type
    }

    fn parse(
        &self,
        _spec: &FieldSpec<'_>,
        text: &str,
    ) -> BinobjResult<FieldValue> {
        let v = parse_integer(self.field_type, text)?;
        let out_of_range = || FieldError::parse(self.field_type, text, "value is out of range");
        let value = if self.signed {
            let v = i64::try_from(v).map_err(|_| out_of_range())?;
            FieldValue::Int(self.check_signed(v).map_err(|_| out_of_range())?)
        } else {
            let v = u64::try_from(v).map_err(|_| out_of_range())?;
            FieldValue::UInt(self.check_unsigned(v).map_err(|_| out_of_range())?)
        };
        Ok(value)
    }

    fn compose(
        &self,
        _spec: &FieldSpec<'_>,
        value: &FieldValue,
    ) -> BinobjResult<String> {
        match value {
            FieldValue::Int(v) => Ok(v.to_string()),
            FieldValue::UInt(v) => Ok(v.to_string()),
            other => Err(FieldError::value_mismatch(self.field_type, other.kind()).into()),
        }
    }

    fn serialize(
        &self,
        _spec: &FieldSpec<'_>,
        value: &FieldValue,
    ) -> BinobjResult<Vec<u8>> {
        let raw = self.raw_value(value)?;
        let width = self.minimal_width(raw);
        Ok(raw.to_le_bytes()[..width].to_vec())
    }

    fn deserialize(
        &self,
        _spec: &FieldSpec<'_>,
        bytes: &[u8],
    ) -> BinobjResult<(FieldValue, usize)> {
        check_packed_len(self.field_type, bytes.len(), self.width)?;
        Ok((self.value_from(bytes), bytes.len()))
    }

    fn serialize_element(
        &self,
        _spec: &FieldSpec<'_>,
        value: &FieldValue,
    ) -> BinobjResult<Vec<u8>> {
        let raw = self.raw_value(value)?;
        Ok(raw.to_le_bytes()[..self.width].to_vec())
    }

    fn deserialize_element(
        &self,
        _spec: &FieldSpec<'_>,
        bytes: &[u8],
    ) -> BinobjResult<(FieldValue, usize)> {
        let bytes = take(self.field_type, bytes, self.width)?;
        Ok((self.value_from(bytes), self.width))
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
