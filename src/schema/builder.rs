//! Сборка графа схемы из сырых описаний.
//!
//! Сначала регистрируются все корневые классы (чтобы друзья могли ссылаться
//! на классы, описанные позже), затем заполняются тела классов, затем файлы
//! объектов и общий словарь по хешу.

use std::{collections::HashSet, str::FromStr};

use binobj_error::{ensure, BinobjResult, ResultExt, SchemaError};
use indexmap::IndexMap;
use tracing::debug;

use super::{
    definitions::{
        label, ClassDefinition, ClassId, Discriminator, EnumDefinition, FieldDefinition,
        FriendDefinition, ObjectFileDefinition,
    },
    graph::SchemaGraph,
    predicate::{Predicate, PredicatePath},
    raw::{RawClass, RawEnum, RawField, RawFriend, RawObjectFile},
};
use crate::{
    fields::{registry, FieldSpec, FieldType},
    hashing::{crc32, parse_hash},
};

#[derive(Debug, Default)]
pub struct SchemaBuilder {
    classes: Vec<RawClass>,
    object_files: Vec<RawObjectFile>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_class(
        &mut self,
        class: RawClass,
    ) -> &mut Self {
        self.classes.push(class);
        self
    }

    pub fn add_object_file(
        &mut self,
        object_file: RawObjectFile,
    ) -> &mut Self {
        self.object_files.push(object_file);
        self
    }

    pub fn build(self) -> BinobjResult<SchemaGraph> {
        let mut graph = SchemaGraph::default();

        let mut root_ids = Vec::with_capacity(self.classes.len());
        for raw in &self.classes {
            let (name, hash) = identity(raw.name.as_deref(), raw.hash.as_deref(), "class")?;
            let hash = hash.ok_or_else(|| SchemaError::MissingIdentity {
                what: "root class".to_string(),
            })?;
            let class_label = label(name.as_deref(), Some(hash));
            let taken = graph.roots_by_hash.contains_key(&hash)
                || name.as_ref().is_some_and(|n| graph.roots_by_name.contains_key(n));
            ensure!(!taken, SchemaError::DuplicateClass { name: class_label });
            let id = alloc(&mut graph, name.clone(), Some(hash));
            graph.roots_by_hash.insert(hash, id);
            if let Some(name) = name {
                graph.roots_by_name.insert(name, id);
            }
            root_ids.push(id);
        }

        for (raw, &id) in self.classes.iter().zip(&root_ids) {
            fill_class(&mut graph, id, raw)
                .with_context(|| format!("class '{}'", graph.class(id).label()))?;
        }

        for raw in &self.object_files {
            add_object_file(&mut graph, raw)
                .with_context(|| format!("object file '{}'", raw.name))?;
        }

        for (index, class) in graph.classes.iter().enumerate() {
            if let Some(hash) = class.hash {
                graph.flat.entry(hash).or_insert(ClassId(index));
            }
        }

        debug!(
            classes = graph.classes.len(),
            roots = graph.roots_by_hash.len(),
            object_files = graph.object_files.len(),
            "schema built"
        );
        Ok(graph)
    }
}

fn alloc(
    graph: &mut SchemaGraph,
    name: Option<String>,
    hash: Option<u32>,
) -> ClassId {
    let id = ClassId(graph.classes.len());
    graph.classes.push(ClassDefinition {
        name,
        hash,
        ..Default::default()
    });
    id
}

/// Имя и хеш из атрибутов. Если заданы оба, хеш обязан совпадать с CRC-32
/// имени.
fn identity(
    name: Option<&str>,
    hash: Option<&str>,
    what: &str,
) -> Result<(Option<String>, Option<u32>), SchemaError> {
    let declared = match hash {
        Some(text) => Some(parse_hash(text).ok_or_else(|| SchemaError::InvalidAttribute {
            attribute: "hash".to_string(),
            value: text.to_string(),
            reason: format!("{what} hash must be hexadecimal"),
        })?),
        None => None,
    };
    match (name, declared) {
        (Some(name), Some(declared)) => {
            let computed = crc32(name);
            if computed != declared {
                return Err(SchemaError::HashMismatch {
                    name: name.to_string(),
                    declared,
                    computed,
                });
            }
            Ok((Some(name.to_string()), Some(declared)))
        }
        (Some(name), None) => Ok((Some(name.to_string()), Some(crc32(name)))),
        (None, declared) => Ok((None, declared)),
    }
}

fn fill_class(
    graph: &mut SchemaGraph,
    id: ClassId,
    raw: &RawClass,
) -> BinobjResult<()> {
    let class_label = graph.class(id).label();

    let discriminator = match (&raw.class_field_name, &raw.class_field_hash) {
        (None, None) => None,
        (name, hash) => {
            let (name, hash) = identity(name.as_deref(), hash.as_deref(), "discriminator")?;
            hash.map(|hash| Discriminator { name, hash })
        }
    };

    let mut fields = IndexMap::with_capacity(raw.fields.len());
    for raw_field in &raw.fields {
        let field = build_field(raw_field)?;
        ensure!(
            !fields.contains_key(&field.hash),
            SchemaError::DuplicateField {
                class: class_label,
                field: field.label(),
            }
        );
        fields.insert(field.hash, field);
    }

    let mut objects = IndexMap::with_capacity(raw.objects.len());
    for raw_object in &raw.objects {
        let (name, hash) = identity(raw_object.name.as_deref(), raw_object.hash.as_deref(), "object")?;
        let hash = hash.ok_or_else(|| SchemaError::MissingIdentity {
            what: format!("object in class '{class_label}'"),
        })?;
        ensure!(
            !objects.contains_key(&hash),
            SchemaError::DuplicateObject {
                class: class_label,
                object: label(name.as_deref(), Some(hash)),
            }
        );
        let child = alloc(graph, name, Some(hash));
        objects.insert(hash, child);
        fill_class(graph, child, raw_object)
            .with_context(|| format!("object '{}'", graph.class(child).label()))?;
    }

    let friends = raw
        .friends
        .iter()
        .map(|f| build_friend(graph, &class_label, f))
        .collect::<Result<Vec<_>, _>>()?;

    let class = &mut graph.classes[id.0];
    class.fields = fields;
    class.objects = objects;
    class.friends = friends;
    class.dynamic_nested_classes = raw.dynamic_nested_classes;
    class.discriminator = discriminator;
    Ok(())
}

fn parse_type(
    attribute: &str,
    text: &str,
) -> Result<FieldType, SchemaError> {
    FieldType::from_str(text).map_err(|e| SchemaError::InvalidAttribute {
        attribute: attribute.to_string(),
        value: text.to_string(),
        reason: e.to_string(),
    })
}

fn build_field(raw: &RawField) -> BinobjResult<FieldDefinition> {
    let (name, hash) = identity(raw.name.as_deref(), raw.hash.as_deref(), "field")?;
    let hash = hash.ok_or_else(|| SchemaError::MissingIdentity {
        what: "field".to_string(),
    })?;
    let field_label = label(name.as_deref(), Some(hash));

    let field_type = match &raw.field_type {
        Some(text) => parse_type("type", text)?,
        None => FieldType::BinHex,
    };
    let element_type = match &raw.array_type {
        Some(text) => {
            if field_type != FieldType::Array32 {
                return Err(SchemaError::ArrayTypeMisuse {
                    field: field_label,
                    field_type: field_type.to_string(),
                }
                .into());
            }
            let element = parse_type("array_type", text)?;
            if !element.is_array_element() {
                return Err(SchemaError::InvalidAttribute {
                    attribute: "array_type".to_string(),
                    value: text.clone(),
                    reason: format!("{element} cannot be an array element"),
                }
                .into());
            }
            Some(element)
        }
        None => None,
    };
    let enumeration = raw
        .enumeration
        .as_ref()
        .map(|e| build_enum(&field_label, e))
        .transpose()?;

    Ok(FieldDefinition {
        name,
        hash,
        field_type,
        element_type,
        enumeration,
    })
}

fn build_enum(
    field: &str,
    raw: &RawEnum,
) -> Result<EnumDefinition, SchemaError> {
    let mut names = HashSet::new();
    let mut values = HashSet::new();
    for element in &raw.elements {
        if !names.insert(element.name.as_str()) {
            return Err(SchemaError::DuplicateEnumName {
                field: field.to_string(),
                element: element.name.clone(),
            });
        }
        if !values.insert(element.value) {
            return Err(SchemaError::DuplicateEnumValue {
                field: field.to_string(),
                value: element.value,
            });
        }
    }
    Ok(EnumDefinition::new(
        raw.name.clone(),
        raw.elements.iter().map(|e| (e.name.clone(), e.value)).collect(),
    ))
}

fn build_friend(
    graph: &SchemaGraph,
    class: &str,
    raw: &RawFriend,
) -> BinobjResult<FriendDefinition> {
    let target = graph
        .root_class_by_name(&raw.name)
        .ok_or_else(|| SchemaError::UnresolvedFriend {
            class: class.to_string(),
            friend: raw.name.clone(),
        })?;

    let predicate = match &raw.condition_field {
        None => None,
        Some(path) => {
            let invalid = |reason: String| SchemaError::InvalidPredicate {
                class: class.to_string(),
                reason,
            };
            let type_text = raw
                .condition_type
                .as_deref()
                .ok_or_else(|| invalid(format!("condition on '{path}' has no condition_type")))?;
            let field_type =
                FieldType::from_str(type_text).map_err(|e| invalid(e.to_string()))?;
            let value = raw.condition_value.clone().unwrap_or_default();
            // Литерал кодируется один раз, при сборке.
            let expected = registry()
                .encode_text(field_type, &FieldSpec::default(), &value)
                .map_err(|e| invalid(format!("cannot encode '{value}' as {field_type}: {e}")))?;
            Some(Predicate {
                path: PredicatePath::parse(class, path)?,
                field_type,
                value,
                expected,
            })
        }
    };

    Ok(FriendDefinition {
        class: target,
        name: raw.name.clone(),
        predicate,
    })
}

fn add_object_file(
    graph: &mut SchemaGraph,
    raw: &RawObjectFile,
) -> BinobjResult<()> {
    let index = graph.object_files.len();
    let mut aliases = Vec::with_capacity(raw.aliases.len() + 1);
    for alias in std::iter::once(&raw.name).chain(&raw.aliases) {
        let alias = alias.trim().to_lowercase();
        ensure!(!graph.aliases.contains_key(&alias), SchemaError::DuplicateAlias { alias });
        graph.aliases.insert(alias.clone(), index);
        aliases.push(alias);
    }

    let root = match &raw.object {
        Some(object) => {
            // Корень файла объектов может быть анонимным.
            let (name, hash) = identity(object.name.as_deref(), object.hash.as_deref(), "object")?;
            let id = alloc(graph, name, hash);
            fill_class(graph, id, object)?;
            Some(id)
        }
        None => None,
    };

    graph.object_files.push(ObjectFileDefinition {
        name: raw.name.clone(),
        aliases,
        root,
    });
    Ok(())
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use binobj_error::StatusCode;

    use super::*;
    use crate::schema::raw::RawEnumElement;

    fn build(classes: Vec<RawClass>) -> BinobjResult<SchemaGraph> {
        let mut builder = SchemaBuilder::new();
        for class in classes {
            builder.add_class(class);
        }
        builder.build()
    }

    fn schema_error(err: &binobj_error::StackError) -> &SchemaError {
        err.downcast_ref::<SchemaError>().unwrap()
    }

    #[test]
    fn test_roots_and_nested_are_indexed() {
        let graph = build(vec![
            RawClass::named("Entity")
                .with_field("Label", "String")
                .with_object(RawClass::named("Transform").with_field("Position", "Vector3")),
            RawClass::named("Transform"),
        ])
        .unwrap();

        let entity = graph.root_class(crc32("Entity")).unwrap();
        assert_eq!(graph.root_class_by_name("Entity"), Some(entity));
        let nested = graph.class(entity).objects[&crc32("Transform")];
        assert_ne!(Some(nested), graph.root_class(crc32("Transform")));
        // Корень регистрируется в общем словаре раньше вложенного класса.
        assert_eq!(graph.class_by_hash(crc32("Transform")), graph.root_class(crc32("Transform")));
    }

    #[test]
    fn test_field_defaults_to_binhex() {
        let mut class = RawClass::named("Blob");
        class.fields.push(RawField {
            name: Some("Payload".into()),
            ..Default::default()
        });
        let graph = build(vec![class]).unwrap();
        let id = graph.root_class_by_name("Blob").unwrap();
        assert_eq!(graph.class(id).fields[&crc32("Payload")].field_type, FieldType::BinHex);
    }

    #[test]
    fn test_hash_must_match_name() {
        let mut class = RawClass::named("Entity");
        class.hash = Some("DEADBEEF".into());
        let err = build(vec![class]).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::HashMismatch);

        let mut class = RawClass::named("Entity");
        class.hash = Some(format!("0x{:08x}", crc32("Entity")));
        assert!(build(vec![class]).is_ok());
    }

    #[test]
    fn test_duplicates_are_rejected() {
        let err = build(vec![RawClass::named("A"), RawClass::named("A")]).unwrap_err();
        assert!(matches!(schema_error(&err), SchemaError::DuplicateClass { .. }));

        let err = build(vec![RawClass::named("A")
            .with_field("X", "Int32")
            .with_field("X", "Int8")])
        .unwrap_err();
        assert!(matches!(schema_error(&err), SchemaError::DuplicateField { .. }));

        let err = build(vec![RawClass::named("A")
            .with_object(RawClass::named("B"))
            .with_object(RawClass::named("B"))])
        .unwrap_err();
        assert!(matches!(schema_error(&err), SchemaError::DuplicateObject { .. }));
    }

    #[test]
    fn test_anonymous_class_rejected_outside_object_files() {
        let err = build(vec![RawClass::default()]).unwrap_err();
        assert!(matches!(schema_error(&err), SchemaError::MissingIdentity { .. }));

        let err = build(vec![RawClass::named("A").with_object(RawClass::default())]).unwrap_err();
        assert!(matches!(schema_error(&err), SchemaError::MissingIdentity { .. }));
    }

    #[test]
    fn test_unresolved_friend() {
        let err = build(vec![RawClass::named("A").with_friend(RawFriend::to("Missing"))]).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UnresolvedReference);
        assert!(err
            .to_string()
            .contains("could not find object 'Missing' referenced by 'A'"));
    }

    #[test]
    fn test_friend_predicate_is_preencoded() {
        let graph = build(vec![
            RawClass::named("Item").with_friend(RawFriend::to("Weapon").when("^Kind", "UInt16", "300")),
            RawClass::named("Weapon"),
        ])
        .unwrap();
        let item = graph.root_class_by_name("Item").unwrap();
        let predicate = graph.class(item).friends[0].predicate.as_ref().unwrap();
        assert_eq!(predicate.expected, vec![0x2C, 0x01]);
        assert_eq!(predicate.path.up, 1);

        let err = build(vec![
            RawClass::named("Item").with_friend(RawFriend::to("Weapon").when("Kind", "UInt8", "999")),
            RawClass::named("Weapon"),
        ])
        .unwrap_err();
        assert!(matches!(schema_error(&err), SchemaError::InvalidPredicate { .. }));
    }

    #[test]
    fn test_array_type_only_on_arrays() {
        let mut class = RawClass::named("A");
        class.fields.push(RawField {
            name: Some("Values".into()),
            field_type: Some("Int32".into()),
            array_type: Some("Int32".into()),
            ..Default::default()
        });
        let err = build(vec![class]).unwrap_err();
        assert!(matches!(schema_error(&err), SchemaError::ArrayTypeMisuse { .. }));
    }

    #[test]
    fn test_enum_duplicates() {
        let mut class = RawClass::named("A");
        class.fields.push(RawField {
            name: Some("Mode".into()),
            field_type: Some("Enum".into()),
            enumeration: Some(RawEnum {
                name: None,
                elements: vec![
                    RawEnumElement {
                        name: "On".into(),
                        value: 1,
                    },
                    RawEnumElement {
                        name: "Off".into(),
                        value: 1,
                    },
                ],
            }),
            ..Default::default()
        });
        let err = build(vec![class]).unwrap_err();
        assert!(matches!(schema_error(&err), SchemaError::DuplicateEnumValue { value: 1, .. }));
    }

    #[test]
    fn test_object_file_aliases() {
        let mut builder = SchemaBuilder::new();
        builder.add_object_file(RawObjectFile {
            name: "EntityLibrary".into(),
            aliases: vec!["Entities".into()],
            object: Some(RawClass::default().with_field("Version", "UInt32")),
        });
        let graph = builder.build().unwrap();
        let file = graph.object_file("ENTITIES").unwrap();
        assert_eq!(file.name, "EntityLibrary");
        assert_eq!(graph.object_file("entitylibrary"), Some(file));
        let root = file.root.unwrap();
        assert_eq!(graph.class(root).hash, None);
        // Анонимный класс не попадает в словарь по хешу.
        assert_eq!(graph.class_by_hash(crc32("Version")), None);

        let mut builder = SchemaBuilder::new();
        builder
            .add_object_file(RawObjectFile {
                name: "A".into(),
                ..Default::default()
            })
            .add_object_file(RawObjectFile {
                name: "B".into(),
                aliases: vec!["a".into()],
                ..Default::default()
            });
        let err = builder.build().unwrap_err();
        assert!(matches!(schema_error(&err), SchemaError::DuplicateAlias { .. }));
    }
}
