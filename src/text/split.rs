//! Экспорт библиотек в несколько файлов.
//!
//! Корни библиотек (`EntityLibraries`, `lib`, `NomadObjectTemplates`) несут
//! тысячи однотипных элементов. Такой документ раскладывается по файлам:
//! корень содержит только ссылки `<object external="..."/>`, каждый элемент
//! лежит в своём файле, названном по его полю имени. Импорт собирает
//! документ обратно через [`DocumentLoader`](super::DocumentLoader).
//!
//! ```text
//! items.xml                  <object name="EntityLibraries" def="...">
//! items/Weapons/@library.xml   <object name="EntityLibrary">
//! items/Weapons/Rifle.xml        <object hash="256A1FF9">...
//! ```

use std::{collections::HashMap, fs, path::Path};

use binobj_error::{BinobjResult, FieldError, ResultExt, TextError};
use tracing::debug;

use super::{
    export::Exporter, format_hash, write_text_tree, TextNode, DEF_ATTR, EXTERNAL_ATTR, OBJECT_TAG,
};
use crate::{
    document::{Document, NodeId},
    fields::{registry, FieldSpec, FieldType, FieldValue},
    schema::ObjectFileDefinition,
};

pub const ENTITY_LIBRARIES_HASH: u32 = 0xBCDD_10B4;
pub const ENTITY_LIBRARY_HASH: u32 = 0xE0BD_B3DB;
pub const ENTITY_LIBRARY_ITEM_HASH: u32 = 0x256A_1FF9;
pub const ENTITY_HASH: u32 = 0x0984_415E;
pub const LIB_HASH: u32 = 0xA90F_3BCC;
pub const LIB_ITEM_HASH: u32 = 0x72DE_4948;
pub const OBJECT_TEMPLATES_HASH: u32 = 0x4C4C_4CA4;
pub const OBJECT_TEMPLATE_HASH: u32 = 0x1423_71CF;
pub const TEMPLATE_HASH: u32 = 0x6E16_7DD5;

/// `Name`
pub const NAME_HASH: u32 = 0xFE11_D138;
/// `disLibItemId`
pub const LIB_ITEM_ID_HASH: u32 = 0x8EDB_0295;
/// `text_hidName`
pub const HIDDEN_NAME_HASH: u32 = 0x9D88_73F8;

/// Файл библиотеки внутри её каталога.
pub const LIBRARY_FILE: &str = "@library.xml";

/// Раскладка документа по файлам.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitLayout {
    /// Библиотеки сущностей: каталог на библиотеку, файл на элемент.
    EntityLibraries,
    /// `lib`: файл на элемент, имя из `text_hidName`.
    Library,
    /// Шаблоны объектов: файл на шаблон.
    ObjectTemplates,
}

impl SplitLayout {
    /// Раскладка, которой соответствует форма документа.
    pub fn detect(document: &Document) -> Option<Self> {
        let root = document.node(document.root());
        if !root.fields().is_empty() {
            return None;
        }
        let layout = match root.hash() {
            ENTITY_LIBRARIES_HASH => Self::EntityLibraries,
            LIB_HASH => Self::Library,
            OBJECT_TEMPLATES_HASH => Self::ObjectTemplates,
            _ => return None,
        };
        let fits = match layout {
            Self::EntityLibraries => children_fit(document, document.root(), ENTITY_LIBRARY_HASH, |library| {
                has_fields(document, library, &[NAME_HASH])
                    && children_fit(document, library, ENTITY_LIBRARY_ITEM_HASH, |item| {
                        has_fields(document, item, &[LIB_ITEM_ID_HASH, NAME_HASH])
                            && children_fit(document, item, ENTITY_HASH, |_| true)
                    })
            }),
            Self::Library => children_fit(document, document.root(), LIB_ITEM_HASH, |item| {
                document.node(item).field(HIDDEN_NAME_HASH).is_some()
            }),
            Self::ObjectTemplates => {
                children_fit(document, document.root(), OBJECT_TEMPLATE_HASH, |template| {
                    has_fields(document, template, &[NAME_HASH])
                        && children_fit(document, template, TEMPLATE_HASH, |_| true)
                })
            }
        };
        fits.then_some(layout)
    }

    /// Поле, из которого берётся имя файла элемента.
    fn name_field(self) -> u32 {
        match self {
            Self::Library => HIDDEN_NAME_HASH,
            Self::EntityLibraries | Self::ObjectTemplates => NAME_HASH,
        }
    }
}

/// Все дети `id` имеют хеш `hash` и удовлетворяют `check`.
fn children_fit(
    document: &Document,
    id: NodeId,
    hash: u32,
    check: impl Fn(NodeId) -> bool,
) -> bool {
    document
        .node(id)
        .children()
        .iter()
        .all(|&c| document.node(c).hash() == hash && check(c))
}

/// Набор полей узла ровно `expected` (без учёта порядка).
fn has_fields(
    document: &Document,
    id: NodeId,
    expected: &[u32],
) -> bool {
    let fields = document.node(id).fields();
    fields.len() == expected.len() && expected.iter().all(|h| fields.contains_key(h))
}

/// Один файл разбиения: путь относительно базового каталога (через `/`) и
/// его дерево.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitFile {
    pub path: String,
    pub root: TextNode,
}

/// Результат экспорта по файлам: главный корень и остальные файлы.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitExport {
    pub layout: SplitLayout,
    pub root: TextNode,
    pub files: Vec<SplitFile>,
}

impl SplitExport {
    /// Записывает файлы разбиения под каталогом `base`. Главный корень
    /// записывает вызывающий.
    pub fn write_files(
        &self,
        base: &Path,
    ) -> BinobjResult<()> {
        for file in &self.files {
            let path = base.join(&file.path);
            let output_error = |e: std::io::Error| TextError::Output {
                path: path.display().to_string(),
                reason: e.to_string(),
            };
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(output_error)?;
            }
            let markup = write_text_tree(&file.root).with_context(|| file.path.clone())?;
            fs::write(&path, markup).map_err(output_error)?;
        }
        debug!(files = self.files.len(), base = %base.display(), "wrote split documents");
        Ok(())
    }
}

impl Exporter<'_> {
    /// Экспорт по файлам в раскладке `layout`.
    pub fn export_split(
        &self,
        document: &Document,
        object_file: Option<&ObjectFileDefinition>,
        layout: SplitLayout,
    ) -> BinobjResult<SplitExport> {
        let binding = self.root_binding(document, object_file);
        let root_id = document.root();
        let mut chain = vec![root_id];
        let (mut root, root_class) =
            self.export_shell(document, root_id, binding.and_then(|(_, c)| c), &chain)?;
        if let Some((file, _)) = binding {
            root.set_attribute(DEF_ATTR, file.name.as_str());
        }

        let mut files = Vec::new();
        let mut names = FileNames::default();
        for &child in document.node(root_id).children() {
            let child_class = self.child_class(document, root_class, child, &chain);
            let name = names.claim(&item_name(document, child, layout.name_field())?, document, child);

            if layout != SplitLayout::EntityLibraries {
                let path = format!("{name}.xml");
                root.children.push(external(&path));
                let item = self.export_node(document, child, child_class, &mut chain)?;
                files.push(SplitFile { path, root: item });
                continue;
            }

            chain.push(child);
            let (mut library, library_class) =
                self.export_shell(document, child, child_class, &chain)?;
            let mut item_names = FileNames::default();
            for &item in document.node(child).children() {
                let item_class = self.child_class(document, library_class, item, &chain);
                let item_file = format!(
                    "{}.xml",
                    item_names.claim(&item_name(document, item, NAME_HASH)?, document, item)
                );
                library.children.push(external(&item_file));
                let item_root = self.export_node(document, item, item_class, &mut chain)?;
                files.push(SplitFile {
                    path: format!("{name}/{item_file}"),
                    root: item_root,
                });
            }
            chain.pop();

            let path = format!("{name}/{LIBRARY_FILE}");
            root.children.push(external(&path));
            files.push(SplitFile { path, root: library });
        }

        debug!(?layout, files = files.len(), "split export");
        Ok(SplitExport {
            layout,
            root,
            files,
        })
    }
}

fn external(path: &str) -> TextNode {
    TextNode::new(OBJECT_TAG).with_attribute(EXTERNAL_ATTR, path)
}

/// Строковое поле `field` узла `id`.
fn item_name(
    document: &Document,
    id: NodeId,
    field: u32,
) -> BinobjResult<String> {
    let node = document.node(id);
    let label = format_hash(field);
    let bytes = node.field(field).unwrap_or_default();
    let value = registry()
        .deserialize_exact(FieldType::String, &FieldSpec::default(), &label, bytes)
        .with_context(|| format!("name of object {}", format_hash(node.hash())))?;
    match value {
        FieldValue::String(name) => Ok(name),
        other => Err(FieldError::value_mismatch(FieldType::String, other.kind()).into()),
    }
}

/// Имена файлов одного каталога. Повтор имени получает суффикс ` (N)`.
#[derive(Debug, Default)]
struct FileNames {
    seen: HashMap<String, usize>,
}

impl FileNames {
    fn claim(
        &mut self,
        name: &str,
        document: &Document,
        id: NodeId,
    ) -> String {
        let mut name = sanitize(name);
        if name.is_empty() {
            name = format_hash(document.node(id).hash());
        }
        let count = self.seen.entry(name.clone()).or_insert(0);
        *count += 1;
        match *count {
            1 => name,
            n => format!("{name} ({n})"),
        }
    }
}

/// Относительный путь из имени элемента: `\` и `/` разделяют каталоги,
/// пустые сегменты и `.`/`..` отбрасываются.
fn sanitize(name: &str) -> String {
    name.split(['/', '\\'])
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .collect::<Vec<_>>()
        .join("/")
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
