use std::fmt;

use num_enum::TryFromPrimitive;

/// Коды статуса для категоризации ошибок.
///
/// # Диапазоны:
/// - 0xxx: Успех
/// - 1xxx: Общие ошибки
/// - 2xxx: Ошибки данных
/// - 5xxx: Повреждённые документы, (де)сериализация
/// - 6xxx: IO
/// - 8xxx: Ошибки формата (wire/markup)
/// - 9xxx: Ошибки схемы
///
/// `num_enum::TryFromPrimitive` даёт нативную реализацию `TryFrom<u32>`,
/// что удобно для кодов возврата CLI и логов.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
#[repr(u32)]
#[non_exhaustive]
pub enum StatusCode {
    // === 0xxx: Успех ===
    Success = 0,

    // === 1xxx: Общие ошибки ===
    Unknown = 1000,
    Unsupported = 1001,
    Unexpected = 1002,
    Internal = 1003,
    InvalidArgs = 1004,
    NotImplemented = 1005,

    // === 2xxx: Ошибки данных ===
    NotFound = 2000,
    AlreadyExists = 2001,
    TypeError = 2002,
    InvalidValue = 2004,
    InvalidData = 2009,

    // === 5xxx: Документы ===
    CorruptedData = 5002,
    SerializationFailed = 5003,
    DeserializationFailed = 5004,

    // === 6xxx: IO ===
    Io = 6000,
    UnexpectedEof = 6007,

    // === 8xxx: Формат ===
    InvalidFrame = 8000,
    UnsupportedVersion = 8002,
    InvalidUtf8 = 8004,
    InvalidInteger = 8005,
    InvalidFloat = 8006,
    SizeLimit = 8007,
    DepthLimit = 8008,
    ParseError = 8009,
    EncodingError = 8010,
    DecodingError = 8011,
    InvalidMarkup = 8012,

    // === 9xxx: Схема ===
    SchemaLoad = 9000,
    DuplicateDefinition = 9001,
    HashMismatch = 9002,
    UnresolvedReference = 9003,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl StatusCode {
    /// Числовое представление кода статуса.
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Пытается получить вариант `StatusCode` из `u32`.
    pub fn from_u32(v: u32) -> Option<Self> {
        Self::try_from(v).ok()
    }

    /// Вернёт `true`, если переданный `code` означает успешный результат.
    pub fn is_success(code: u32) -> bool {
        Self::Success as u32 == code
    }

    /// Ошибка во входных данных пользователя: документ, разметка или схема.
    pub fn is_client_error(&self) -> bool {
        let c = self.code();
        if (2000..=2999).contains(&c) || (8000..=9999).contains(&c) {
            return true;
        }
        matches!(self, Self::InvalidArgs | Self::CorruptedData)
    }

    /// Ошибка формата (диапазон 8xxx).
    pub fn is_format_error(&self) -> bool {
        (8000..=8999).contains(&self.code())
    }

    /// Ошибка схемы (диапазон 9xxx).
    pub fn is_schema_error(&self) -> bool {
        (9000..=9999).contains(&self.code())
    }

    /// Требуется ли логировать как критическую ошибку.
    pub fn is_critical(&self) -> bool {
        matches!(self, Self::Internal | Self::Unexpected)
    }

    /// Рекомендуемый уровень логирования для данного кода.
    pub fn log_level(&self) -> LogLevel {
        match self {
            Self::Success => LogLevel::Trace,
            Self::NotFound | Self::AlreadyExists => LogLevel::Debug,
            Self::InvalidArgs | Self::TypeError | Self::InvalidValue | Self::InvalidData => {
                LogLevel::Info
            }
            Self::Internal | Self::Unexpected => LogLevel::Error,
            _ => LogLevel::Warn,
        }
    }

    /// Код завершения процесса для CLI.
    pub fn exit_code(&self) -> i32 {
        match self.code() {
            0 => 0,
            8000..=8999 => 3,
            9000..=9999 => 4,
            6000..=6999 => 5,
            _ => 1,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов для StatusCode
////////////////////////////////////////////////////////////////////////////////

impl From<StatusCode> for u32 {
    fn from(c: StatusCode) -> Self {
        c.code()
    }
}

impl fmt::Display for StatusCode {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{:?} ({})", self, self.code())
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    /// Тест проверяет разделение ошибок формата и схемы.
    #[test]
    fn test_ranges() {
        assert!(StatusCode::DepthLimit.is_format_error());
        assert!(!StatusCode::DepthLimit.is_schema_error());
        assert!(StatusCode::DuplicateDefinition.is_schema_error());
        assert!(StatusCode::HashMismatch.is_client_error());
        assert!(!StatusCode::Internal.is_client_error());
    }

    /// Тест проверяет конвертацию через `TryFrom<u32>` и вспомогательную
    /// `from_u32`.
    #[test]
    fn test_from_try_from_u32() {
        let n = StatusCode::NotFound.code();
        assert_eq!(StatusCode::try_from(n).unwrap(), StatusCode::NotFound);
        assert!(StatusCode::from_u32(99999).is_none());
    }

    #[test]
    fn test_code_and_into() {
        let c = StatusCode::InvalidFrame;
        assert_eq!(c.code(), 8000);
        let n: u32 = c.into();
        assert_eq!(n, 8000);
        assert!(StatusCode::is_success(StatusCode::Success.code()));
    }

    /// Тест проверяет отображаемый уровень логирования для разных кодов.
    #[test]
    fn test_log_level_mappings() {
        assert_eq!(StatusCode::Success.log_level(), LogLevel::Trace);
        assert_eq!(StatusCode::NotFound.log_level(), LogLevel::Debug);
        assert_eq!(StatusCode::Internal.log_level(), LogLevel::Error);
        assert_eq!(StatusCode::CorruptedData.log_level(), LogLevel::Warn);
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(StatusCode::Success.exit_code(), 0);
        assert_eq!(StatusCode::UnexpectedEof.exit_code(), 5);
        assert_eq!(StatusCode::ParseError.exit_code(), 3);
        assert_eq!(StatusCode::SchemaLoad.exit_code(), 4);
        assert_eq!(StatusCode::Internal.exit_code(), 1);
    }

    #[test]
    fn test_display_contains_name_and_code() {
        let s = format!("{}", StatusCode::DepthLimit);
        assert!(s.contains("8008"), "got: {s}");
        assert!(s.contains("DepthLimit"), "got: {s}");
    }
}
