use std::{any::Any, error::Error};

use crate::StatusCode;

/// Расширение для ошибок библиотеки (object-safe).
///
/// Предоставляет вспомогательные методы для работы с ошибками:
/// статус-код, доступ к конкретному типу и детальное сообщение для логов.
pub trait ErrorExt: Error + Send + Sync + 'static {
    /// Статус ошибки.
    ///
    /// По умолчанию возвращает [`StatusCode::Internal`].
    fn status_code(&self) -> StatusCode {
        StatusCode::Internal
    }

    /// Возвращает ошибку как [`Any`](std::any::Any),
    /// чтобы можно было выполнить downcast к конкретному типу.
    fn as_any(&self) -> &dyn Any;

    /// Детализированное сообщение для логов.
    fn log_message(&self) -> String {
        format!("{self:?}")
    }

    /// Имя типа ошибки (для логирования).
    fn type_name(&self) -> String {
        std::any::type_name::<Self>()
            .split("::")
            .last()
            .unwrap_or("Unknown")
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::{any::Any, error::Error, fmt};

    use super::*;

    #[derive(Debug)]
    struct DefaultError(pub &'static str);

    impl fmt::Display for DefaultError {
        fn fmt(
            &self,
            f: &mut fmt::Formatter<'_>,
        ) -> fmt::Result {
            write!(f, "DefaultError: {}", self.0)
        }
    }

    impl Error for DefaultError {}

    impl ErrorExt for DefaultError {
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[derive(Debug)]
    struct NotFoundError(pub &'static str);

    impl fmt::Display for NotFoundError {
        fn fmt(
            &self,
            f: &mut fmt::Formatter<'_>,
        ) -> fmt::Result {
            write!(f, "NotFound: {}", self.0)
        }
    }

    impl Error for NotFoundError {}

    impl ErrorExt for NotFoundError {
        fn status_code(&self) -> StatusCode {
            StatusCode::NotFound
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    /// Тест проверяет, что по умолчанию статус ошибки — `Internal`.
    #[test]
    fn test_default_status_code_is_internal() {
        assert_eq!(DefaultError("oops").status_code(), StatusCode::Internal);
        assert_eq!(NotFoundError("x").status_code(), StatusCode::NotFound);
    }

    /// Тест проверяет, что `as_any` позволяет выполнить downcast.
    #[test]
    fn test_as_any_downcast() {
        let e = NotFoundError("x");
        let down = e.as_any().downcast_ref::<NotFoundError>();
        assert_eq!(down.map(|d| d.0), Some("x"));
    }

    #[test]
    fn test_log_message_matches_debug() {
        let e = NotFoundError("dbg");
        assert_eq!(e.log_message(), format!("{e:?}"));
    }

    #[test]
    fn test_type_name_returns_short_struct_name() {
        let tn = NotFoundError("n").type_name();
        assert!(tn.ends_with("NotFoundError"), "got: {tn}");
    }
}
