use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Формат вывода событий.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let name = match self {
            Self::Compact => "compact",
            Self::Pretty => "pretty",
            Self::Json => "json",
        };
        f.write_str(name)
    }
}

/// Настройки логирования (секция `log`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Уровень по умолчанию или директива `EnvFilter` (`binobj=debug`).
    pub level: String,
    pub format: LogFormat,
    pub with_ansi: bool,
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Compact,
            with_ansi: true,
            with_target: false,
        }
    }
}

impl LoggingConfig {
    /// Повышает уровень по числу флагов `-v`.
    pub fn with_verbosity(
        mut self,
        verbose: u8,
    ) -> Self {
        match verbose {
            0 => {}
            1 => self.level = "info".to_string(),
            2 => self.level = "debug".to_string(),
            _ => self.level = "trace".to_string(),
        }
        self
    }

    /// Директива фильтра: уровни из `level` применяются к нашему крейту,
    /// остальным достаётся `warn`.
    pub fn build_filter_directive(&self) -> String {
        let level = self.level.trim();
        if level.contains('=') || level.contains(',') {
            level.to_string()
        } else {
            format!("warn,binobj={level}")
        }
    }
}
