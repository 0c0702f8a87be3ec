//! Текстовое дерево -> документ.

use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use binobj_error::{BinobjResult, FormatError, ResultExt, TextError};
use tracing::debug;

use super::{
    read_text_tree, TextNode, ARRAY_TYPE_ATTR, DEF_ATTR, EXTERNAL_ATTR, FIELD_TAG, HASH_ATTR,
    NAME_ATTR, OBJECT_TAG, TYPE_ATTR,
};
use crate::{
    document::{decode::DEFAULT_MAX_DEPTH, Document, Node, NodeId},
    fields::{registry, FieldSpec, FieldType},
    hashing::{crc32, parse_hash},
    schema::{AncestorChain, ClassId, FieldDefinition, ObjectFileDefinition, SchemaGraph},
};

/// Загруженный внешний фрагмент и каталог, относительно которого
/// разрешаются его собственные внешние ссылки.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedDocument {
    pub root: TextNode,
    pub base: PathBuf,
}

/// Источник внешних фрагментов (`<object external="..."/>`).
pub trait DocumentLoader {
    fn load(
        &self,
        base: &Path,
        relative: &str,
    ) -> BinobjResult<LoadedDocument>;
}

/// Загрузка фрагментов с диска.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsDocumentLoader;

impl DocumentLoader for FsDocumentLoader {
    fn load(
        &self,
        base: &Path,
        relative: &str,
    ) -> BinobjResult<LoadedDocument> {
        // Пути во внешних ссылках могут быть записаны с `\`.
        let path = base.join(relative.replace('\\', "/"));
        let markup = fs::read_to_string(&path).map_err(|e| TextError::External {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let root = read_text_tree(&markup).with_context(|| format!("'{}'", path.display()))?;
        let base = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(LoadedDocument { root, base })
    }
}

/// Импорт с загрузкой внешних фрагментов с диска.
pub fn import_document(
    schema: &SchemaGraph,
    root: &TextNode,
    object_file: Option<&ObjectFileDefinition>,
    base: &Path,
) -> BinobjResult<Document> {
    Importer::new(schema).import(root, object_file, base)
}

pub struct Importer<'a, L = FsDocumentLoader> {
    schema: &'a SchemaGraph,
    loader: L,
    max_depth: usize,
}

impl<'a> Importer<'a> {
    pub fn new(schema: &'a SchemaGraph) -> Self {
        Self::with_loader(schema, FsDocumentLoader)
    }
}

impl<'a, L: DocumentLoader> Importer<'a, L> {
    pub fn with_loader(
        schema: &'a SchemaGraph,
        loader: L,
    ) -> Self {
        Self {
            schema,
            loader,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn max_depth(
        mut self,
        max_depth: usize,
    ) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Строит документ из корневого элемента `root`.
    ///
    /// Описание файла объектов берётся из `object_file`, а если оно не
    /// передано, то из атрибута `def` корня.
    pub fn import(
        &self,
        root: &TextNode,
        object_file: Option<&ObjectFileDefinition>,
        base: &Path,
    ) -> BinobjResult<Document> {
        let object_file = match object_file {
            Some(file) => Some(file),
            None => root
                .attribute(DEF_ATTR)
                .and_then(|def| self.schema.object_file(def)),
        };
        let mut document = Document::empty();
        let mut chain = Vec::new();
        let root_id = self.import_node(
            &mut document,
            root,
            object_file.and_then(|f| f.root),
            base,
            &mut chain,
            0,
        )?;
        document.root = root_id;
        debug!(nodes = document.len(), "imported document");
        Ok(document)
    }

    fn import_node(
        &self,
        document: &mut Document,
        element: &TextNode,
        static_class: Option<ClassId>,
        base: &Path,
        chain: &mut Vec<NodeId>,
        depth: usize,
    ) -> BinobjResult<NodeId> {
        if depth >= self.max_depth {
            return Err(FormatError::DepthLimit {
                depth,
                limit: self.max_depth,
                offset: None,
            }
            .into());
        }
        if element.tag != OBJECT_TAG {
            return Err(TextError::UnexpectedElement {
                expected: OBJECT_TAG.to_string(),
                found: element.tag.clone(),
            }
            .into());
        }

        if let Some(relative) = element.attribute(EXTERNAL_ATTR) {
            let loaded = self
                .loader
                .load(base, relative)
                .with_context(|| format!("external object '{relative}'"))?;
            debug!(path = relative, "importing external object");
            return self.import_node(
                document,
                &loaded.root,
                static_class,
                &loaded.base,
                chain,
                depth + 1,
            );
        }

        let (name, hash) = identity(element)?;
        if let Some(class_hash) = static_class.and_then(|c| self.schema.class(c).hash) {
            if class_hash != hash {
                return Err(TextError::IdentityMismatch {
                    name: name.unwrap_or_default().to_string(),
                    hash,
                    expected: class_hash,
                }
                .into());
            }
        }
        let node_label = name
            .map(str::to_string)
            .unwrap_or_else(|| super::format_hash(hash));

        let class = self
            .discriminate(static_class, element)
            .with_context(|| format!("object '{node_label}'"))?;

        let id = document.push_node(Node::new(hash));
        chain.push(id);

        for field in element.children_named(FIELD_TAG) {
            self.import_field(document, id, class, field, chain)
                .with_context(|| format!("object '{node_label}'"))?;
        }

        for child in element.children_named(OBJECT_TAG) {
            let child_class = match child_hash(child)? {
                Some(child_hash) => {
                    let ancestors = AncestorChain::new(document, chain);
                    self.schema.child_class(class, child_hash, &ancestors)
                }
                // Внешний фрагмент: его хеш станет известен после загрузки.
                None => self.external_class(class, document, chain, child, base)?,
            };
            let child_id = self.import_node(document, child, child_class, base, chain, depth + 1)?;
            document.node_mut(id).children.push(child_id);
        }

        chain.pop();
        Ok(id)
    }

    /// Класс внешнего фрагмента по хешу его корня.
    fn external_class(
        &self,
        class: Option<ClassId>,
        document: &Document,
        chain: &[NodeId],
        child: &TextNode,
        base: &Path,
    ) -> BinobjResult<Option<ClassId>> {
        let Some(relative) = child.attribute(EXTERNAL_ATTR) else {
            return Ok(None);
        };
        if class.is_none() {
            return Ok(None);
        }
        let loaded = self
            .loader
            .load(base, relative)
            .with_context(|| format!("external object '{relative}'"))?;
        let Some(hash) = child_hash(&loaded.root)? else {
            return Ok(None);
        };
        let ancestors = AncestorChain::new(document, chain);
        Ok(self.schema.child_class(class, hash, &ancestors))
    }

    /// Уточняет статический класс по текстовому значению дискриминатора.
    /// Если поля нет, остаётся статический класс.
    fn discriminate(
        &self,
        static_class: Option<ClassId>,
        element: &TextNode,
    ) -> BinobjResult<Option<ClassId>> {
        let Some(class) = static_class else {
            return Ok(None);
        };
        let Some(discriminator) = &self.schema.class(class).discriminator else {
            return Ok(Some(class));
        };
        let mut found = None;
        for field in element.children_named(FIELD_TAG) {
            if identity(field)?.1 == discriminator.hash {
                found = Some(field);
                break;
            }
        }
        let Some(field) = found else {
            return Ok(Some(class));
        };

        // Тип из разметки важнее объявленного: экспорт мог записать поле как
        // `BinHex`, если уточнённый класс его не описывает.
        let declared = self.schema.class(class).fields.get(&discriminator.hash);
        let field_type = match field.attribute(TYPE_ATTR) {
            Some(text) => Some(FieldType::from_str(text)?),
            None => declared.map(|d| d.field_type),
        };
        let bytes = match field_type {
            Some(field_type) => {
                let spec = declared
                    .filter(|d| d.field_type == field_type)
                    .map(|d| d.spec())
                    .unwrap_or_default();
                registry().import(field_type, &spec, &discriminator.label(), field)?
            }
            None => {
                let hash = parse_hash(&field.text).ok_or_else(|| TextError::InvalidHash {
                    text: field.text.clone(),
                })?;
                hash.to_le_bytes().to_vec()
            }
        };
        self.schema.discriminated_class(class, &bytes)
    }

    fn import_field(
        &self,
        document: &mut Document,
        id: NodeId,
        class: Option<ClassId>,
        field: &TextNode,
        chain: &[NodeId],
    ) -> BinobjResult<()> {
        let (name, hash) = identity(field)?;
        let field_label = name
            .map(str::to_string)
            .unwrap_or_else(|| super::format_hash(hash));

        let ancestors = AncestorChain::new(document, chain);
        let definition: Option<&FieldDefinition> =
            class.and_then(|c| self.schema.field_definition(c, hash, &ancestors));

        let field_type = match (field.attribute(TYPE_ATTR), definition) {
            (Some(text), _) => FieldType::from_str(text)?,
            (None, Some(def)) => def.field_type,
            (None, None) => {
                return Err(TextError::MissingAttribute {
                    tag: FIELD_TAG.to_string(),
                    attribute: TYPE_ATTR.to_string(),
                }
                .into())
            }
        };
        if let Some(def) = definition {
            if def.field_type != field_type {
                return Err(TextError::FieldTypeMismatch {
                    field: field_label,
                    declared: def.field_type.to_string(),
                    actual: field_type.to_string(),
                }
                .into());
            }
        }
        let element_type = match field.attribute(ARRAY_TYPE_ATTR) {
            Some(text) => Some(FieldType::from_str(text)?),
            None => definition.and_then(|d| d.element_type),
        };
        let spec = FieldSpec {
            enumeration: definition.and_then(|d| d.enumeration.as_ref()),
            element_type,
        };

        let bytes = registry().import(field_type, &spec, &field_label, field)?;
        if document.node(id).field(hash).is_some() {
            return Err(TextError::DuplicateField { field: field_label }.into());
        }
        document.set_field(id, hash, bytes);
        Ok(())
    }
}

/// Имя и хеш элемента. Если заданы оба, хеш обязан совпадать с CRC-32
/// имени.
fn identity(element: &TextNode) -> Result<(Option<&str>, u32), TextError> {
    let declared = match element.attribute(HASH_ATTR) {
        Some(text) => Some(parse_hash(text).ok_or_else(|| TextError::InvalidHash {
            text: text.to_string(),
        })?),
        None => None,
    };
    match (element.attribute(NAME_ATTR), declared) {
        (Some(name), Some(hash)) => {
            let expected = crc32(name);
            if expected != hash {
                return Err(TextError::IdentityMismatch {
                    name: name.to_string(),
                    hash,
                    expected,
                });
            }
            Ok((Some(name), hash))
        }
        (Some(name), None) => Ok((Some(name), crc32(name))),
        (None, Some(hash)) => Ok((None, hash)),
        (None, None) => Err(TextError::MissingIdentity {
            tag: element.tag.clone(),
        }),
    }
}

/// Хеш дочернего элемента; `None` для внешней ссылки без имени и хеша.
fn child_hash(element: &TextNode) -> Result<Option<u32>, TextError> {
    if element.attribute(EXTERNAL_ATTR).is_some()
        && element.attribute(NAME_ATTR).is_none()
        && element.attribute(HASH_ATTR).is_none()
    {
        return Ok(None);
    }
    identity(element).map(|(_, hash)| Some(hash))
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
