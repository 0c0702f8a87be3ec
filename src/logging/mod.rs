//! Logging.
//!
//! Один слой `tracing-subscriber` в stderr с фильтром `EnvFilter`.

pub mod config;
mod filters;
mod formatter;

pub use config::{LogFormat, LoggingConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Устанавливает глобальный подписчик.
///
/// Повторный вызов возвращает ошибку, а не паникует.
pub fn init_logging(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = filters::build_filter_from_config(config);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(formatter::build_formatter_from_config(config))
        .try_init()?;

    tracing::debug!(
        version = env!("CARGO_PKG_VERSION"),
        level = %config.level,
        format = %config.format,
        "logging initialized"
    );
    Ok(())
}
