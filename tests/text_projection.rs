//! Проекция документов в разметку и обратно.

use std::{fs, path::Path};

use binobj::{
    document::{encode_document, read_document, Document},
    fields::{registry, FieldSpec, FieldType},
    hashing::crc32,
    rml::{read_rml, write_rml, RmlAttribute, RmlDocument, RmlNode},
    schema::{
        RawClass, RawEnum, RawEnumElement, RawField, RawFriend, RawObjectFile, SchemaBuilder,
        SchemaGraph,
    },
    text::{
        export_document, import_document, read_text_tree, write_text_tree, Exporter, SplitLayout,
        TextNode,
    },
};
use binobj_error::TextError;

fn schema() -> SchemaGraph {
    let mut entity = RawClass::named("Entity").with_field("Label", "String");
    entity.fields.push(RawField {
        name: Some("Mode".to_string()),
        field_type: Some("Enum".to_string()),
        enumeration: Some(RawEnum {
            name: None,
            elements: vec![
                RawEnumElement {
                    name: "Idle".to_string(),
                    value: 0,
                },
                RawEnumElement {
                    name: "Busy".to_string(),
                    value: 1,
                },
            ],
        }),
        ..Default::default()
    });
    entity.fields.push(RawField {
        name: Some("Offsets".to_string()),
        field_type: Some("Array32".to_string()),
        array_type: Some("Int16".to_string()),
        ..Default::default()
    });
    let entity = entity
        .with_field("Script", "Rml")
        .with_object(RawClass::named("Transform").with_field("Position", "Vector3"));

    let mut builder = SchemaBuilder::new();
    builder.add_class(entity.clone()).add_object_file(RawObjectFile {
        name: "Scene".to_string(),
        aliases: vec![],
        object: Some(entity),
    });
    builder.build().unwrap()
}

fn script() -> Vec<u8> {
    let mut root = RmlNode::new("script");
    root.attributes.push(RmlAttribute {
        name: "lang".to_string(),
        value: "dialog".to_string(),
    });
    let mut line = RmlNode::new("line");
    line.value = "Find the key".to_string();
    root.children.push(line);
    write_rml(&RmlDocument { flags: 1, root }).unwrap()
}

fn vector(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn sample() -> Document {
    let mut doc = Document::new(crc32("Entity"));
    let root = doc.root();
    doc.set_field(root, crc32("Label"), b"crate\0".to_vec());
    doc.set_field(root, crc32("Mode"), vec![1, 0, 0, 0]);
    doc.set_field(root, crc32("Offsets"), vec![2, 0, 0, 0, 5, 0, 0xFF, 0xFF]);
    doc.set_field(root, crc32("Script"), script());
    doc.set_field(root, 0xDEAD, vec![1, 2, 3]);
    let transform = doc.add_child(root, crc32("Transform"));
    doc.set_field(transform, crc32("Position"), vector(&[1.5, -2.0, 0.25]));
    let unknown = doc.add_child(root, 0x1234);
    doc.set_field(unknown, 0x99, vec![0xAB]);
    doc
}

/// Тест проверяет полный цикл: байты -> документ -> разметка -> документ ->
/// те же байты.
#[test]
fn test_markup_round_trip_is_lossless() {
    let schema = schema();
    let bytes = encode_document(&sample()).unwrap();
    let doc = read_document(&bytes).unwrap();

    let text = export_document(&schema, &doc, schema.object_file("scene")).unwrap();
    let markup = write_text_tree(&text).unwrap();
    assert!(markup.contains(r#"def="Scene""#), "{markup}");
    assert!(markup.contains(r#"<field name="Mode" type="Enum">Busy</field>"#), "{markup}");
    assert!(markup.contains(r#"hash="0000DEAD""#), "{markup}");
    assert!(markup.contains(r#"<object hash="00001234">"#), "{markup}");

    let parsed = read_text_tree(&markup).unwrap();
    assert_eq!(parsed, text);
    let imported = import_document(&schema, &parsed, None, Path::new(".")).unwrap();
    assert_eq!(imported, doc);
    assert_eq!(encode_document(&imported).unwrap(), bytes);
}

/// Тест проверяет, что без схемы всё проецируется по хешам и тоже без
/// потерь.
#[test]
fn test_round_trip_without_schema() {
    let schema = SchemaGraph::empty();
    let doc = sample();
    let text = export_document(&schema, &doc, None).unwrap();
    assert_eq!(text.attribute("hash"), Some(format!("{:08X}", crc32("Entity")).as_str()));
    assert!(text
        .children_named("field")
        .all(|f| f.attribute("type") == Some("BinHex")));

    let back = import_document(&schema, &text, None, Path::new(".")).unwrap();
    assert_eq!(back, doc);
}

#[test]
fn test_array_and_rml_shape() {
    let schema = schema();
    let text = export_document(&schema, &sample(), schema.object_file("Scene")).unwrap();
    let field = |name: &str| {
        text.children_named("field")
            .find(|f| f.attribute("name") == Some(name))
            .unwrap()
    };

    let offsets = field("Offsets");
    assert_eq!(offsets.attribute("array_type"), Some("Int16"));
    let items: Vec<&str> = offsets.children.iter().map(|i| i.text.as_str()).collect();
    assert_eq!(items, vec!["5", "-1"]);

    let wrapper = field("Script").first_child("rml").unwrap();
    assert_eq!(wrapper.attribute("flags"), Some("01"));
    let root = &wrapper.children[0];
    assert_eq!(root.tag, "script");
    assert_eq!(root.attribute("lang"), Some("dialog"));
    assert_eq!(root.children[0].text, "Find the key");
}

/// Тест проверяет внешние фрагменты на диске, включая вложенные ссылки
/// относительно каталога фрагмента.
#[test]
fn test_external_documents_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let parts = dir.path().join("parts");
    fs::create_dir_all(parts.join("extra")).unwrap();
    fs::write(
        parts.join("transform.xml"),
        r#"<object name="Transform">
             <field name="Position">1.5,-2,0.25</field>
             <object external="extra/blob.xml"/>
           </object>"#,
    )
    .unwrap();
    fs::write(
        parts.join("extra").join("blob.xml"),
        r#"<object hash="00000042"><field hash="00000001" type="UInt8">5</field></object>"#,
    )
    .unwrap();

    let root = read_text_tree(
        r#"<?xml version="1.0" encoding="utf-8"?>
           <object name="Entity" def="Scene">
             <field name="Label">crate</field>
             <object external="parts\transform.xml"/>
           </object>"#,
    )
    .unwrap();

    let schema = schema();
    let doc = import_document(&schema, &root, None, dir.path()).unwrap();
    let root = doc.node(doc.root());
    assert_eq!(root.field(crc32("Label")), Some(&b"crate\0"[..]));

    let transform = doc.node(root.children()[0]);
    assert_eq!(transform.hash(), crc32("Transform"));
    assert_eq!(
        transform.field(crc32("Position")),
        Some(vector(&[1.5, -2.0, 0.25]).as_slice())
    );
    let blob = doc.node(transform.children()[0]);
    assert_eq!(blob.hash(), 0x42);
    assert_eq!(blob.field(1), Some(&[5][..]));
}

#[test]
fn test_missing_external_file() {
    let dir = tempfile::tempdir().unwrap();
    let root = TextNode::new("object")
        .with_attribute("name", "Entity")
        .with_child(TextNode::new("object").with_attribute("external", "nope.xml"));
    let err = import_document(&schema(), &root, None, dir.path()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<TextError>(),
        Some(TextError::External { .. })
    ));
}

#[test]
fn test_malformed_markup() {
    let err = read_text_tree("<object name=\"a\"><field></object>").unwrap_err();
    assert!(matches!(
        err.downcast_ref::<TextError>(),
        Some(TextError::Markup { .. })
    ));
}

/// Тест проверяет отдельную конвертацию RML через обёртку `rml`.
#[test]
fn test_standalone_rml_markup() {
    let bytes = script();
    let (rml, consumed) = read_rml(&bytes).unwrap();
    assert_eq!(consumed, bytes.len());

    let markup = write_text_tree(&rml.to_text_node()).unwrap();
    let back = RmlDocument::from_text_node(&read_text_tree(&markup).unwrap()).unwrap();
    assert_eq!(back, rml);
    assert_eq!(write_rml(&back).unwrap(), bytes);

    assert!(RmlDocument::from_text_node(&TextNode::new("script")).is_err());
}

/// Тест проверяет, что класс корня из описания файла объектов не
/// применяется к корню с другим хешем и разметка остаётся обратимой.
#[test]
fn test_object_file_root_with_other_hash() {
    let schema = schema();
    let mut doc = Document::new(crc32("SomethingElse"));
    let root = doc.root();
    doc.set_field(root, crc32("Label"), b"crate\0".to_vec());

    let text = export_document(&schema, &doc, schema.object_file("Scene")).unwrap();
    assert_eq!(text.attribute("hash"), Some("30323A70"));
    assert_eq!(text.attribute("name"), None);
    assert_eq!(text.attribute("def"), None);
    let label = text.first_child("field").unwrap();
    assert_eq!(label.attribute("type"), Some("BinHex"));

    let parsed = read_text_tree(&write_text_tree(&text).unwrap()).unwrap();
    let back = import_document(&schema, &parsed, None, Path::new(".")).unwrap();
    assert_eq!(back, doc);
}

/// Классы с дискриминатором, динамическими детьми и друзьями по условию.
fn class_schema() -> SchemaGraph {
    let mut part = RawClass::named("Part").with_field("Type", "StringId");
    part.class_field_name = Some("Type".to_string());

    let slot = RawClass {
        hash: Some("00001234".to_string()),
        class_field_name: Some("Type".to_string()),
        ..Default::default()
    }
    .with_field("Type", "UInt32");

    let mut folder = RawClass::named("Folder");
    folder.dynamic_nested_classes = true;

    let garage = RawClass::named("Garage").with_field("Kind", "String").with_object(
        RawClass::named("Entry")
            .with_friend(RawFriend::to("Vehicle").when("^Kind", "String", "Vehicle"))
            .with_friend(RawFriend::to("Weapon").when("^Kind", "String", "Weapon")),
    );

    let mut builder = SchemaBuilder::new();
    builder
        .add_class(part)
        .add_class(
            RawClass::named("Gear")
                .with_field("Teeth", "UInt8")
                .with_object(RawClass::named("Cog").with_field("Size", "UInt8")),
        )
        .add_class(RawClass::named("Rack").with_object(slot))
        .add_class(folder)
        .add_class(garage)
        .add_class(RawClass::named("Vehicle").with_field("Wheels", "UInt8"))
        .add_class(RawClass::named("Weapon").with_field("Damage", "Float"));
    builder.build().unwrap()
}

/// Экспорт корня по классу схемы, затем разметка и импорт обратно.
fn round_trip(
    schema: &SchemaGraph,
    doc: &Document,
    class: &str,
) -> TextNode {
    let class = schema.root_class_by_name(class).unwrap();
    let file = binobj::schema::ObjectFileDefinition {
        name: "Test".to_string(),
        aliases: vec!["test".to_string()],
        root: Some(class),
    };
    let text = export_document(schema, doc, Some(&file)).unwrap();
    let parsed = read_text_tree(&write_text_tree(&text).unwrap()).unwrap();
    let back = import_document(schema, &parsed, Some(&file), Path::new(".")).unwrap();
    assert_eq!(&back, doc);
    text
}

fn field<'a>(
    node: &'a TextNode,
    name: &str,
) -> &'a TextNode {
    node.children_named("field")
        .find(|f| f.attribute("name") == Some(name))
        .unwrap_or_else(|| panic!("no field '{name}' in {node:?}"))
}

/// Тест проверяет, что узел с дискриминатором экспортируется полями и
/// детьми выбранного класса, а имя пишется по статическому классу.
#[test]
fn test_discriminated_node_uses_selected_class() {
    let schema = class_schema();
    let mut doc = Document::new(crc32("Part"));
    let root = doc.root();
    let gear = registry()
        .encode_text(FieldType::StringId, &FieldSpec::default(), "Gear")
        .unwrap();
    doc.set_field(root, crc32("Type"), gear);
    doc.set_field(root, crc32("Teeth"), vec![12]);
    let cog = doc.add_child(root, crc32("Cog"));
    doc.set_field(cog, crc32("Size"), vec![3]);

    let text = round_trip(&schema, &doc, "Part");
    assert_eq!(text.attribute("name"), Some("Part"));
    let teeth = field(&text, "Teeth");
    assert_eq!(teeth.attribute("type"), Some("UInt8"));
    assert_eq!(teeth.text, "12");
    let cog = text.first_child("object").unwrap();
    assert_eq!(cog.attribute("name"), Some("Cog"));
    assert_eq!(field(cog, "Size").text, "3");
}

/// Тест проверяет, что имя уточнённого класса не подменяет хеш узла, если
/// хеши различаются.
#[test]
fn test_discriminated_name_needs_matching_hash() {
    let schema = class_schema();
    let mut doc = Document::new(crc32("Rack"));
    let root = doc.root();
    let slot = doc.add_child(root, 0x1234);
    let gear = registry()
        .encode_text(FieldType::UInt32, &FieldSpec::default(), &crc32("Gear").to_string())
        .unwrap();
    doc.set_field(slot, crc32("Type"), gear);
    doc.set_field(slot, crc32("Teeth"), vec![7]);

    let text = round_trip(&schema, &doc, "Rack");
    let slot = text.first_child("object").unwrap();
    assert_eq!(slot.attribute("hash"), Some("00001234"));
    assert_eq!(slot.attribute("name"), None);
    assert_eq!(field(slot, "Teeth").text, "7");
    let markup = write_text_tree(&text).unwrap();
    assert!(!markup.contains(r#"name="Gear""#), "{markup}");
}

/// Тест проверяет детей класса с динамическими вложенными классами: они
/// ищутся по всей схеме.
#[test]
fn test_dynamic_children_round_trip() {
    let schema = class_schema();
    let mut doc = Document::new(crc32("Folder"));
    let root = doc.root();
    let gear = doc.add_child(root, crc32("Gear"));
    doc.set_field(gear, crc32("Teeth"), vec![9]);
    let unknown = doc.add_child(root, 0x77);
    doc.set_field(unknown, 0x1, vec![0xAA]);

    let text = round_trip(&schema, &doc, "Folder");
    let children: Vec<&TextNode> = text.children_named("object").collect();
    assert_eq!(children[0].attribute("name"), Some("Gear"));
    assert_eq!(field(children[0], "Teeth").text, "9");
    assert_eq!(children[1].attribute("hash"), Some("00000077"));
}

/// Тест проверяет поля, которые описывает друг при выполненном условии по
/// полю предка.
#[test]
fn test_friend_fields_round_trip() {
    let schema = class_schema();
    let string = |text: &str| {
        registry()
            .encode_text(FieldType::String, &FieldSpec::default(), text)
            .unwrap()
    };

    let mut doc = Document::new(crc32("Garage"));
    let root = doc.root();
    doc.set_field(root, crc32("Kind"), string("Vehicle"));
    let entry = doc.add_child(root, crc32("Entry"));
    doc.set_field(entry, crc32("Wheels"), vec![4]);
    doc.set_field(entry, crc32("Damage"), 2.5f32.to_le_bytes().to_vec());

    let text = round_trip(&schema, &doc, "Garage");
    let entry = text.first_child("object").unwrap();
    assert_eq!(field(entry, "Wheels").attribute("type"), Some("UInt8"));
    // Друг Weapon не подходит: поле остаётся безымянным.
    let damage = format!("{:08X}", crc32("Damage"));
    assert!(entry
        .children_named("field")
        .any(|f| f.attribute("hash") == Some(damage.as_str())
            && f.attribute("type") == Some("BinHex")));

    doc.set_field(root, crc32("Kind"), string("Weapon"));
    let text = round_trip(&schema, &doc, "Garage");
    let entry = text.first_child("object").unwrap();
    assert_eq!(field(entry, "Damage").attribute("type"), Some("Float"));
}

/// Тест проверяет экспорт библиотеки по файлам и сборку её обратно через
/// внешние ссылки.
#[test]
fn test_split_export_round_trip() {
    use binobj::text::split::{
        ENTITY_HASH, ENTITY_LIBRARIES_HASH, ENTITY_LIBRARY_HASH, ENTITY_LIBRARY_ITEM_HASH,
        LIB_ITEM_ID_HASH, NAME_HASH,
    };

    let mut doc = Document::new(ENTITY_LIBRARIES_HASH);
    let root = doc.root();
    let library = doc.add_child(root, ENTITY_LIBRARY_HASH);
    doc.set_field(library, NAME_HASH, b"Weapons\0".to_vec());
    for (id, name) in [(1u8, "Rifle"), (2, "Rifle"), (3, "guns\\Pistol")] {
        let item = doc.add_child(library, ENTITY_LIBRARY_ITEM_HASH);
        doc.set_field(item, LIB_ITEM_ID_HASH, vec![id]);
        let mut bytes = name.as_bytes().to_vec();
        bytes.push(0);
        doc.set_field(item, NAME_HASH, bytes);
        let entity = doc.add_child(item, ENTITY_HASH);
        doc.set_field(entity, 0x10, vec![id, id]);
    }

    let schema = SchemaGraph::empty();
    let layout = SplitLayout::detect(&doc).unwrap();
    assert_eq!(layout, SplitLayout::EntityLibraries);
    let split = Exporter::new(&schema).export_split(&doc, None, layout).unwrap();
    let paths: Vec<&str> = split.files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(
        paths,
        vec![
            "Weapons/Rifle.xml",
            "Weapons/Rifle (2).xml",
            "Weapons/guns/Pistol.xml",
            "Weapons/@library.xml",
        ]
    );

    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("weapons");
    split.write_files(&base).unwrap();
    let main = dir.path().join("weapons.xml");
    fs::write(&main, write_text_tree(&split.root).unwrap()).unwrap();
    assert!(base.join("Weapons").join("guns").join("Pistol.xml").is_file());

    let markup = fs::read_to_string(&main).unwrap();
    assert!(markup.contains(r#"external="Weapons/@library.xml""#), "{markup}");
    let root = read_text_tree(&markup).unwrap();
    let back = import_document(&schema, &root, None, &base).unwrap();
    assert_eq!(back, doc);
}
