//! Настройки: значения по умолчанию, файл `binobj.toml` и переменные
//! окружения `BINOBJ_*`.

pub mod settings;

pub use settings::{DecodeSettings, Settings, DEFAULT_CONFIG_FILE, ENV_PREFIX};
