//! Документ -> текстовое дерево.

use binobj_error::{BinobjResult, ResultExt};
use tracing::{debug, trace};

use super::{
    format_hash, TextNode, ARRAY_TYPE_ATTR, DEF_ATTR, FIELD_TAG, HASH_ATTR, NAME_ATTR,
    OBJECT_TAG, TYPE_ATTR,
};
use crate::{
    document::{Document, NodeId},
    fields::{registry, FieldSpec, FieldType},
    schema::{AncestorChain, ClassId, ObjectFileDefinition, SchemaGraph},
};

/// Проекция документа в текст по схеме.
#[derive(Debug, Clone, Copy)]
pub struct Exporter<'a> {
    pub(super) schema: &'a SchemaGraph,
}

/// Описание файла объектов, принятое для корня документа, и класс корня.
pub(super) type RootBinding<'f> = (&'f ObjectFileDefinition, Option<ClassId>);

/// Экспорт с описанием файла объектов `object_file`, если оно известно.
pub fn export_document(
    schema: &SchemaGraph,
    document: &Document,
    object_file: Option<&ObjectFileDefinition>,
) -> BinobjResult<TextNode> {
    Exporter::new(schema).export(document, object_file)
}

impl<'a> Exporter<'a> {
    pub fn new(schema: &'a SchemaGraph) -> Self {
        Self { schema }
    }

    /// Атрибут `def` пишется, только если описание применимо к корню: иначе
    /// импорт по нему отверг бы документ.
    pub fn export(
        &self,
        document: &Document,
        object_file: Option<&ObjectFileDefinition>,
    ) -> BinobjResult<TextNode> {
        let binding = self.root_binding(document, object_file);
        let mut chain = Vec::new();
        let mut root = self.export_node(
            document,
            document.root(),
            binding.and_then(|(_, class)| class),
            &mut chain,
        )?;
        if let Some((file, _)) = binding {
            root.set_attribute(DEF_ATTR, file.name.as_str());
        }
        debug!(
            nodes = document.len(),
            def = binding.map(|(f, _)| f.name.as_str()),
            "exported document"
        );
        Ok(root)
    }

    /// Класс корня из описания файла объектов. Описание не применяется, если
    /// его класс объявляет хеш, отличный от хеша корня.
    pub(super) fn root_binding<'f>(
        &self,
        document: &Document,
        object_file: Option<&'f ObjectFileDefinition>,
    ) -> Option<RootBinding<'f>> {
        let file = object_file?;
        let root_hash = document.node(document.root()).hash();
        match file.root.map(|c| (c, self.schema.class(c).hash)) {
            Some((class, Some(hash))) if hash != root_hash => {
                debug!(
                    def = %file.name,
                    class = %self.schema.class(class).label(),
                    root = %format_hash(root_hash),
                    "object file does not describe this root"
                );
                None
            }
            Some((class, _)) => Some((file, Some(class))),
            None => Some((file, None)),
        }
    }

    pub(super) fn export_node(
        &self,
        document: &Document,
        id: NodeId,
        static_class: Option<ClassId>,
        chain: &mut Vec<NodeId>,
    ) -> BinobjResult<TextNode> {
        chain.push(id);
        let (mut out, class) = self.export_shell(document, id, static_class, chain)?;
        for &child in document.node(id).children() {
            let child_class = self.child_class(document, class, child, chain);
            let child_node = self.export_node(document, child, child_class, chain)?;
            out.children.push(child_node);
        }
        chain.pop();
        Ok(out)
    }

    /// Элемент узла `id` с полями, но без детей. `chain` уже заканчивается
    /// узлом `id`. Возвращает и эффективный класс узла.
    pub(super) fn export_shell(
        &self,
        document: &Document,
        id: NodeId,
        static_class: Option<ClassId>,
        chain: &[NodeId],
    ) -> BinobjResult<(TextNode, Option<ClassId>)> {
        let node = document.node(id);
        let class = self.schema.effective_class(static_class, node)?;

        // Имя берётся только у класса с тем же хешем, что у узла; статический
        // класс важнее уточнённого дискриминатором.
        let named = |c: Option<ClassId>| {
            c.map(|c| self.schema.class(c))
                .filter(|def| def.hash == Some(node.hash()))
                .and_then(|def| def.name.as_deref())
        };
        let name = named(static_class).or_else(|| named(class));

        let mut out = TextNode::new(OBJECT_TAG);
        match name {
            Some(name) => out.set_attribute(NAME_ATTR, name),
            None => out.set_attribute(HASH_ATTR, format_hash(node.hash())),
        }
        let node_label = name
            .map(str::to_string)
            .unwrap_or_else(|| format_hash(node.hash()));

        let ancestors = AncestorChain::new(document, chain);
        for (&hash, bytes) in node.fields() {
            let definition = class.and_then(|c| self.schema.field_definition(c, hash, &ancestors));
            let mut field = TextNode::new(FIELD_TAG);
            let (field_type, spec, field_label) = match definition {
                Some(def) => {
                    match &def.name {
                        Some(name) => field.set_attribute(NAME_ATTR, name.as_str()),
                        None => field.set_attribute(HASH_ATTR, format_hash(hash)),
                    }
                    (def.field_type, def.spec(), def.label())
                }
                None => {
                    trace!(field = %format_hash(hash), object = %node_label, "field has no definition");
                    field.set_attribute(HASH_ATTR, format_hash(hash));
                    (FieldType::BinHex, FieldSpec::default(), format_hash(hash))
                }
            };
            field.set_attribute(TYPE_ATTR, field_type.name());
            if let Some(element_type) = spec.element_type {
                field.set_attribute(ARRAY_TYPE_ATTR, element_type.name());
            }
            registry()
                .export(field_type, &spec, &field_label, bytes, &mut field)
                .with_context(|| format!("object '{node_label}'"))?;
            out.children.push(field);
        }
        Ok((out, class))
    }

    /// Класс ребёнка `child` узла, которым заканчивается `chain`.
    pub(super) fn child_class(
        &self,
        document: &Document,
        class: Option<ClassId>,
        child: NodeId,
        chain: &[NodeId],
    ) -> Option<ClassId> {
        let ancestors = AncestorChain::new(document, chain);
        self.schema
            .child_class(class, document.node(child).hash(), &ancestors)
    }
}
