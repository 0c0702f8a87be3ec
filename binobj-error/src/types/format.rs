use std::any::Any;

use crate::{ErrorExt, StatusCode};

/// Ошибки бинарного формата документа (wire level).
///
/// Смещения (`offset`) и объект (`subject`, имя или хеш узла/поля) добавляются
/// по мере того, как ошибка поднимается по стеку декодера.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// Данные закончились раньше, чем ожидалось
    UnexpectedEof {
        context: String,
        offset: Option<u64>,
        subject: Option<String>,
        expected_bytes: Option<u64>,
        available_bytes: Option<u64>,
    },

    /// Неверный magic number в заголовке
    InvalidMagic { expected: u32, got: u32 },

    /// Неподдерживаемая версия документа
    UnsupportedVersion { found: u16, supported: u16 },

    /// Неподдерживаемые флаги заголовка
    UnsupportedFlags { flags: u16 },

    /// Ссылка там, где допустим только литерал
    ReferenceNotAllowed {
        what: String,
        offset: Option<u64>,
        subject: Option<String>,
    },

    /// Ссылка на значение, которое само является ссылкой
    NestedReference {
        offset: Option<u64>,
        subject: Option<String>,
    },

    /// Ссылка на узел, который ещё не был прочитан
    DanglingReference {
        index: u32,
        available: usize,
        offset: Option<u64>,
    },

    /// Ссылка на узел, который ещё декодируется (предок текущего)
    CyclicReference { index: u32, offset: Option<u64> },

    /// Превышена глубина вложенности
    DepthLimit {
        depth: usize,
        limit: usize,
        offset: Option<u64>,
    },

    /// Счётчики заголовка не совпали с фактическими
    CountMismatch {
        what: String,
        declared: u64,
        actual: u64,
    },

    /// Прочие повреждения структуры
    CorruptedData {
        reason: String,
        offset: Option<u64>,
        subject: Option<String>,
    },
}

impl FormatError {
    /// Конец данных: `expected` байт нужно, `available` осталось.
    pub fn unexpected_eof(
        context: impl Into<String>,
        expected: u64,
        available: u64,
    ) -> Self {
        Self::UnexpectedEof {
            context: context.into(),
            offset: None,
            subject: None,
            expected_bytes: Some(expected),
            available_bytes: Some(available),
        }
    }

    pub fn corrupted(reason: impl Into<String>) -> Self {
        Self::CorruptedData {
            reason: reason.into(),
            offset: None,
            subject: None,
        }
    }

    /// Добавляет контекст offset к ошибке.
    pub fn with_offset(
        mut self,
        offset: u64,
    ) -> Self {
        match &mut self {
            Self::UnexpectedEof { offset: o, .. }
            | Self::ReferenceNotAllowed { offset: o, .. }
            | Self::NestedReference { offset: o, .. }
            | Self::DanglingReference { offset: o, .. }
            | Self::CyclicReference { offset: o, .. }
            | Self::DepthLimit { offset: o, .. }
            | Self::CorruptedData { offset: o, .. } => {
                // Самое глубокое смещение точнее, не затираем его.
                if o.is_none() {
                    *o = Some(offset);
                }
            }
            _ => {}
        }
        self
    }

    /// Добавляет имя (или хеш) узла/поля, в котором случилась ошибка.
    pub fn with_subject(
        mut self,
        subject: impl Into<String>,
    ) -> Self {
        match &mut self {
            Self::UnexpectedEof { subject: s, .. }
            | Self::ReferenceNotAllowed { subject: s, .. }
            | Self::NestedReference { subject: s, .. }
            | Self::CorruptedData { subject: s, .. } => {
                if s.is_none() {
                    *s = Some(subject.into());
                }
            }
            _ => {}
        }
        self
    }

    /// Смещение, если известно.
    pub fn offset(&self) -> Option<u64> {
        match self {
            Self::UnexpectedEof { offset, .. }
            | Self::ReferenceNotAllowed { offset, .. }
            | Self::NestedReference { offset, .. }
            | Self::DanglingReference { offset, .. }
            | Self::CyclicReference { offset, .. }
            | Self::DepthLimit { offset, .. }
            | Self::CorruptedData { offset, .. } => *offset,
            _ => None,
        }
    }
}

fn write_context(
    f: &mut std::fmt::Formatter<'_>,
    offset: Option<u64>,
    subject: Option<&str>,
) -> std::fmt::Result {
    if let Some(off) = offset {
        write!(f, " at offset {off}")?;
    }
    if let Some(s) = subject {
        write!(f, " (in {s})")?;
    }
    Ok(())
}

impl std::fmt::Display for FormatError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            Self::UnexpectedEof {
                context,
                offset,
                subject,
                expected_bytes,
                available_bytes,
            } => {
                write!(f, "Unexpected end of data: {context}")?;
                if let (Some(exp), Some(got)) = (expected_bytes, available_bytes) {
                    write!(f, " (expected {exp} bytes, {got} available)")?;
                }
                write_context(f, *offset, subject.as_deref())
            }
            Self::InvalidMagic { expected, got } => {
                write!(
                    f,
                    "Invalid magic number: expected 0x{expected:08X}, got 0x{got:08X}"
                )
            }
            Self::UnsupportedVersion { found, supported } => {
                write!(f, "Unsupported version {found} (supported: {supported})")
            }
            Self::UnsupportedFlags { flags } => {
                write!(f, "Unsupported header flags 0x{flags:04X}")
            }
            Self::ReferenceNotAllowed {
                what,
                offset,
                subject,
            } => {
                write!(f, "{what} cannot be a back-reference")?;
                write_context(f, *offset, subject.as_deref())
            }
            Self::NestedReference { offset, subject } => {
                write!(f, "Field value reference points at another reference")?;
                write_context(f, *offset, subject.as_deref())
            }
            Self::DanglingReference {
                index,
                available,
                offset,
            } => {
                write!(
                    f,
                    "Node reference #{index} is out of range ({available} nodes decoded)"
                )?;
                write_context(f, *offset, None)
            }
            Self::CyclicReference { index, offset } => {
                write!(f, "Node reference #{index} points at an unfinished ancestor")?;
                write_context(f, *offset, None)
            }
            Self::DepthLimit {
                depth,
                limit,
                offset,
            } => {
                write!(f, "Nesting depth {depth} exceeds limit {limit}")?;
                write_context(f, *offset, None)
            }
            Self::CountMismatch {
                what,
                declared,
                actual,
            } => {
                write!(
                    f,
                    "Header declares {declared} {what}, document contains {actual}"
                )
            }
            Self::CorruptedData {
                reason,
                offset,
                subject,
            } => {
                write!(f, "Corrupted data: {reason}")?;
                write_context(f, *offset, subject.as_deref())
            }
        }
    }
}

impl std::error::Error for FormatError {}

impl ErrorExt for FormatError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::UnexpectedEof { .. } => StatusCode::UnexpectedEof,
            Self::InvalidMagic { .. } | Self::UnsupportedFlags { .. } => StatusCode::InvalidFrame,
            Self::UnsupportedVersion { .. } => StatusCode::UnsupportedVersion,
            Self::DepthLimit { .. } => StatusCode::DepthLimit,
            Self::ReferenceNotAllowed { .. }
            | Self::NestedReference { .. }
            | Self::DanglingReference { .. }
            | Self::CyclicReference { .. }
            | Self::CountMismatch { .. }
            | Self::CorruptedData { .. } => StatusCode::CorruptedData,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
