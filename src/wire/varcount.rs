//! VarCount: счётчик переменной длины с поддержкой обратных ссылок.
//!
//! Формат первого байта `b`:
//! - `b < 0xFE`: литерал, значение равно `b` (1 байт)
//! - `b == 0xFF`: литерал, значение в следующих 4 байтах (LE)
//! - `b == 0xFE`: ссылка, в следующих 4 байтах индекс узла или расстояние
//!   назад до значения поля

use std::io::Write;

use binobj_error::{BinobjResult, ResultExt};
use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};

/// Максимальное кол-во байт одного токена.
pub const MAX_VARCOUNT_LEN: usize = 5;
/// Наибольшее значение, которое помещается в однобайтовый литерал.
pub const INLINE_MAX: u32 = 0xFD;
/// Тег ссылки.
pub const TAG_REFERENCE: u8 = 0xFE;
/// Тег 4-байтового литерала.
pub const TAG_LITERAL_U32: u8 = 0xFF;

/// Прочитанный токен.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarCount {
    Literal(u32),
    Reference(u32),
}

impl VarCount {
    /// Возвращает значение литерала или `None` для ссылки.
    pub fn literal(self) -> Option<u32> {
        match self {
            Self::Literal(v) => Some(v),
            Self::Reference(_) => None,
        }
    }

    pub fn is_reference(self) -> bool {
        matches!(self, Self::Reference(_))
    }
}

/// Длина литерального токена для `value` в байтах.
pub fn encoded_len(value: u32) -> usize {
    if value <= INLINE_MAX {
        1
    } else {
        MAX_VARCOUNT_LEN
    }
}

/// Записывает литеральный токен. Ссылки энкодер не порождает никогда.
///
/// # Examples
/// ```
/// use binobj::wire::varcount::write_varcount;
///
/// let mut buf = Vec::new();
/// write_varcount(&mut buf, 253).unwrap();
/// assert_eq!(buf, vec![0xFD]);
///
/// let mut buf = Vec::new();
/// write_varcount(&mut buf, 254).unwrap();
/// assert_eq!(buf, vec![0xFF, 0xFE, 0x00, 0x00, 0x00]);
/// ```
pub fn write_varcount<W: Write>(
    w: &mut W,
    value: u32,
) -> BinobjResult<usize> {
    if value <= INLINE_MAX {
        w.write_u8(value as u8)
            .context("Failed to write varcount byte")?;
        return Ok(1);
    }

    w.write_u8(TAG_LITERAL_U32)
        .context("Failed to write varcount tag")?;
    w.write_u32::<LittleEndian>(value)
        .context("Failed to write varcount value")?;
    Ok(MAX_VARCOUNT_LEN)
}

/// Декодирует токен из начала `bytes`.
///
/// Возвращает токен и число занятых байт, либо `None`, если данных
/// недостаточно.
pub fn decode_varcount(bytes: &[u8]) -> Option<(VarCount, usize)> {
    let (&tag, rest) = bytes.split_first()?;
    match tag {
        TAG_REFERENCE | TAG_LITERAL_U32 => {
            if rest.len() < 4 {
                return None;
            }
            let value = LittleEndian::read_u32(&rest[..4]);
            let token = if tag == TAG_REFERENCE {
                VarCount::Reference(value)
            } else {
                VarCount::Literal(value)
            };
            Some((token, MAX_VARCOUNT_LEN))
        }
        b => Some((VarCount::Literal(u32::from(b)), 1)),
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
