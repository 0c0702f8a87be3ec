//! Hash primitives.
//!
//! Все имена классов, полей и объектов превращаются в 32-битные идентификаторы
//! через CRC-32 от UTF-8 байтов. Для 64-битных идентификаторов используется
//! FNV-1a.

const FNV64_OFFSET: u64 = 0xCBF2_9CE4_8422_2325;
const FNV64_PRIME: u64 = 0x0000_0100_0000_01B3;

/// CRC-32 (IEEE) от UTF-8 представления строки.
pub fn crc32(text: &str) -> u32 {
    crc32fast::hash(text.as_bytes())
}

/// FNV-1a 64 от UTF-8 представления строки.
pub fn fnv1a64(text: &str) -> u64 {
    text.as_bytes().iter().fold(FNV64_OFFSET, |hash, &b| {
        (hash ^ u64::from(b)).wrapping_mul(FNV64_PRIME)
    })
}

/// Хеш имени с учётом регистра.
pub fn string_id(text: &str) -> u32 {
    crc32(text)
}

/// Хеш имени без учёта регистра.
pub fn no_case_string_id(text: &str) -> u32 {
    crc32(&text.to_lowercase())
}

/// Хеш пути: регистр не важен, разделители приводятся к `\`.
pub fn path_id(text: &str) -> u32 {
    crc32(&normalize_path(text))
}

pub fn string_id64(text: &str) -> u64 {
    fnv1a64(text)
}

pub fn no_case_string_id64(text: &str) -> u64 {
    fnv1a64(&text.to_lowercase())
}

pub fn path_id64(text: &str) -> u64 {
    fnv1a64(&normalize_path(text))
}

fn normalize_path(text: &str) -> String {
    text.to_lowercase().replace('/', "\\")
}

/// Разбирает запись хеша: шестнадцатеричное число, `0x` необязателен.
pub fn parse_hash(text: &str) -> Option<u32> {
    let t = text.trim();
    let digits = t
        .strip_prefix("0x")
        .or_else(|| t.strip_prefix("0X"))
        .unwrap_or(t);
    if digits.is_empty() || digits.len() > 8 {
        return None;
    }
    u32::from_str_radix(digits, 16).ok()
}
