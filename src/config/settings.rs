use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::{
    document::{decode::DEFAULT_MAX_DEPTH, DecodeOptions},
    logging::LoggingConfig,
};

/// Файл настроек, который ищется в текущем каталоге.
pub const DEFAULT_CONFIG_FILE: &str = "binobj.toml";
pub const ENV_PREFIX: &str = "BINOBJ";

/// Параметры декодера (секция `decode`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeSettings {
    pub max_depth: usize,
    pub verify_header_counts: bool,
}

impl Default for DecodeSettings {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            verify_header_counts: false,
        }
    }
}

impl From<&DecodeSettings> for DecodeOptions {
    fn from(settings: &DecodeSettings) -> Self {
        Self {
            max_depth: settings.max_depth,
            verify_header_counts: settings.verify_header_counts,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Каталог с `*.binaryclass.xml` и `*.binaryobjectfile.xml`.
    pub definitions_path: Option<PathBuf>,
    pub decode: DecodeSettings,
    pub log: LoggingConfig,
}

impl Settings {
    /// Значения по умолчанию, затем `binobj.toml` (если есть), затем
    /// переменные окружения `BINOBJ_*`.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// То же, что [`Settings::load`], но с явным файлом настроек, который
    /// обязан существовать.
    pub fn load_from(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };
        Self::build(file, env_source())
    }

    fn build(
        file: File<config::FileSourceFile, config::FileFormat>,
        env: Environment,
    ) -> Result<Self, ConfigError> {
        let defaults = LoggingConfig::default();
        let cfg = Config::builder()
            // Значения по умолчанию
            .set_default("decode.max_depth", DEFAULT_MAX_DEPTH as u64)?
            .set_default("decode.verify_header_counts", false)?
            .set_default("log.level", defaults.level)?
            .set_default("log.format", defaults.format.to_string())?
            .set_default("log.with_ansi", defaults.with_ansi)?
            .set_default("log.with_target", defaults.with_target)?
            .add_source(file)
            .add_source(env)
            .build()?;

        cfg.try_deserialize()
    }

    pub fn decode_options(&self) -> DecodeOptions {
        DecodeOptions::from(&self.decode)
    }
}

/// `BINOBJ_DECODE__MAX_DEPTH` -> `decode.max_depth`.
fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
