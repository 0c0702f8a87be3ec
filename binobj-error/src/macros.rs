/// Немедленно возвращает ошибку из текущей функции.
///
/// Формы:
/// - `bail!(err)` принимает готовую доменную ошибку или `StackError`;
/// - `bail!(code, "msg")` создаёт `GenericError` с кодом и сообщением;
/// - `bail!(code, "fmt {}", arg)` форматирует сообщение.
///
/// ```ignore
/// use binobj_error::{bail, StatusCode};
///
/// fn check_alias(alias: &str) -> binobj_error::BinobjResult<()> {
///     if alias.is_empty() {
///         bail!(StatusCode::InvalidArgs, "Alias cannot be empty");
///     }
///     Ok(())
/// }
/// ```
#[macro_export]
macro_rules! bail {
    ($err:expr) => {
        return Err($crate::StackError::from($err))
    };
    ($code:expr, $msg:expr) => {
        return Err($crate::StackError::new(
            $crate::types::GenericError::new($code, $msg)
        ))
    };
    ($code:expr, $fmt:expr, $($arg:tt)*) => {
        return Err($crate::StackError::new(
            $crate::types::GenericError::new($code, format!($fmt, $($arg)*))
        ))
    };
}

/// Проверяет условие и вызывает `bail!`, если оно ложно.
///
/// ```ignore
/// use binobj_error::{ensure, StatusCode};
///
/// fn check_version(version: u16) -> binobj_error::BinobjResult<()> {
///     ensure!(version == 3, StatusCode::UnsupportedVersion, "version {}", version);
///     Ok(())
/// }
/// ```
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr) => {
        if !($cond) {
            $crate::bail!($err);
        }
    };
    ($cond:expr, $code:expr, $msg:expr) => {
        if !($cond) {
            $crate::bail!($code, $msg);
        }
    };
    ($cond:expr, $code:expr, $fmt:expr, $($arg:tt)*) => {
        if !($cond) {
            $crate::bail!($code, $fmt, $($arg)*);
        }
    };
}

/// Трейт-расширение для `Result`: `.context(...)` и `.with_context(...)`
/// превращают ошибку в [`StackError`](crate::StackError) и приклеивают к ней
/// контекст.
pub trait ResultExt<T> {
    fn context<C>(
        self,
        ctx: C,
    ) -> Result<T, crate::StackError>
    where
        C: Into<String>;

    /// Ленивый контекст: строка строится только в случае ошибки.
    fn with_context<C, F>(
        self,
        f: F,
    ) -> Result<T, crate::StackError>
    where
        C: Into<String>,
        F: FnOnce() -> C;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: Into<crate::StackError>,
{
    #[track_caller]
    fn context<C>(
        self,
        ctx: C,
    ) -> Result<T, crate::StackError>
    where
        C: Into<String>,
    {
        self.map_err(|e| e.into().context(ctx))
    }

    #[track_caller]
    fn with_context<C, F>(
        self,
        f: F,
    ) -> Result<T, crate::StackError>
    where
        C: Into<String>,
        F: FnOnce() -> C,
    {
        self.map_err(|e| e.into().context(f()))
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
