//! Загрузка описаний схемы из файлов.

use std::{fs, path::Path};

use binobj_error::{BinobjResult, ResultExt, SchemaError};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::{
    builder::SchemaBuilder,
    graph::SchemaGraph,
    raw::{RawClass, RawObjectFile},
};

pub const CLASS_FILE_SUFFIX: &str = ".binaryclass.xml";
pub const OBJECT_FILE_SUFFIX: &str = ".binaryobjectfile.xml";

fn parse<T: DeserializeOwned>(
    source: &str,
    markup: &str,
) -> Result<T, SchemaError> {
    quick_xml::de::from_str(markup).map_err(|e| SchemaError::Source {
        path: source.to_string(),
        reason: e.to_string(),
    })
}

/// Разбирает описание одного класса.
pub fn parse_class(markup: &str) -> BinobjResult<RawClass> {
    Ok(parse("<inline>", markup)?)
}

/// Разбирает описание одного файла объектов.
pub fn parse_object_file(markup: &str) -> BinobjResult<RawObjectFile> {
    Ok(parse("<inline>", markup)?)
}

fn matching_files(
    dir: &Path,
    suffix: &str,
) -> BinobjResult<Vec<std::path::PathBuf>> {
    let pattern = dir.join("**").join(format!("*{suffix}"));
    let pattern = pattern.to_string_lossy();
    let entries = glob::glob(&pattern).map_err(|e| SchemaError::Source {
        path: pattern.to_string(),
        reason: e.to_string(),
    })?;
    let mut paths = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| SchemaError::Source {
            path: e.path().display().to_string(),
            reason: e.error().to_string(),
        })?;
        paths.push(path);
    }
    // Порядок файлов определяет, какой класс побеждает в общем словаре.
    paths.sort();
    Ok(paths)
}

fn read_file<T: DeserializeOwned>(path: &Path) -> BinobjResult<T> {
    let markup =
        fs::read_to_string(path).with_context(|| format!("reading '{}'", path.display()))?;
    Ok(parse(&path.display().to_string(), &markup)?)
}

/// Загружает все `*.binaryclass.xml` и `*.binaryobjectfile.xml` из каталога
/// (рекурсивно) и собирает граф.
pub fn load_dir(dir: &Path) -> BinobjResult<SchemaGraph> {
    if !dir.is_dir() {
        return Err(SchemaError::Source {
            path: dir.display().to_string(),
            reason: "not a directory".to_string(),
        }
        .into());
    }

    let mut builder = SchemaBuilder::new();
    let class_files = matching_files(dir, CLASS_FILE_SUFFIX)?;
    for path in &class_files {
        debug!(path = %path.display(), "loading class");
        builder.add_class(read_file(path)?);
    }
    let object_files = matching_files(dir, OBJECT_FILE_SUFFIX)?;
    for path in &object_files {
        debug!(path = %path.display(), "loading object file");
        builder.add_object_file(read_file(path)?);
    }

    let graph = builder.build()?;
    info!(
        dir = %dir.display(),
        class_files = class_files.len(),
        object_files = object_files.len(),
        "definitions loaded"
    );
    Ok(graph)
}
