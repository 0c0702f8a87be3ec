//! Граф схемы: друзья с условиями, дискриминатор, файлы объектов.

use std::fs;

use binobj::{
    document::{Document, NodeId},
    fields::{registry, FieldSpec, FieldType},
    hashing::crc32,
    schema::{load_dir, AncestorChain, RawClass, RawFriend, RawObjectFile, SchemaBuilder, SchemaGraph},
};

/// `Garage.Kind` выбирает, какой друг описывает поля вложенного `Entry`.
fn garage_schema() -> SchemaGraph {
    let mut builder = SchemaBuilder::new();
    builder
        .add_class(
            RawClass::named("Garage")
                .with_field("Kind", "String")
                .with_object(
                    RawClass::named("Entry")
                        .with_field("Label", "String")
                        .with_friend(RawFriend::to("Vehicle").when("^Kind", "String", "Vehicle"))
                        .with_friend(RawFriend::to("Weapon").when("^Kind", "String", "Weapon")),
                ),
        )
        .add_class(RawClass::named("Vehicle").with_field("Wheels", "UInt8"))
        .add_class(RawClass::named("Weapon").with_field("Damage", "Float"));
    builder.build().unwrap()
}

fn garage(kind: &str) -> (Document, Vec<NodeId>) {
    let mut doc = Document::new(crc32("Garage"));
    let root = doc.root();
    let kind = registry()
        .encode_text(FieldType::String, &FieldSpec::default(), kind)
        .unwrap();
    doc.set_field(root, crc32("Kind"), kind);
    let entry = doc.add_child(root, crc32("Entry"));
    (doc, vec![root, entry])
}

/// Тест проверяет, что поле ищется у друга, только если условие по полю
/// предка выполнено.
#[test]
fn test_friend_predicate_selects_definitions() {
    let schema = garage_schema();
    let garage_class = schema.root_class_by_name("Garage").unwrap();

    let (doc, chain) = garage("Vehicle");
    let root_chain = AncestorChain::new(&doc, &chain[..1]);
    let entry_class = schema
        .child_class(Some(garage_class), crc32("Entry"), &root_chain)
        .unwrap();

    let ancestors = AncestorChain::new(&doc, &chain);
    let wheels = schema
        .field_definition(entry_class, crc32("Wheels"), &ancestors)
        .unwrap();
    assert_eq!(wheels.field_type, FieldType::UInt8);
    assert!(schema
        .field_definition(entry_class, crc32("Damage"), &ancestors)
        .is_none());
    // Собственные поля класса находятся всегда.
    assert!(schema
        .field_definition(entry_class, crc32("Label"), &ancestors)
        .is_some());

    let (doc, chain) = garage("Weapon");
    let ancestors = AncestorChain::new(&doc, &chain);
    assert!(schema
        .field_definition(entry_class, crc32("Wheels"), &ancestors)
        .is_none());
    let damage = schema
        .field_definition(entry_class, crc32("Damage"), &ancestors)
        .unwrap();
    assert_eq!(damage.field_type, FieldType::Float);
}

#[test]
fn test_cyclic_friends_terminate() {
    let mut builder = SchemaBuilder::new();
    builder
        .add_class(RawClass::named("A").with_friend(RawFriend::to("B")))
        .add_class(RawClass::named("B").with_friend(RawFriend::to("A")));
    let schema = builder.build().unwrap();
    let doc = Document::new(crc32("A"));
    let chain = [doc.root()];
    let ancestors = AncestorChain::new(&doc, &chain);
    let a = schema.root_class_by_name("A").unwrap();
    assert!(schema.field_definition(a, crc32("Missing"), &ancestors).is_none());
}

fn part_schema() -> SchemaGraph {
    let mut part = RawClass::named("Part").with_field("Type", "StringId");
    part.class_field_name = Some("Type".to_string());
    let mut folder = RawClass::named("Folder");
    folder.dynamic_nested_classes = true;

    let mut builder = SchemaBuilder::new();
    builder
        .add_class(part)
        .add_class(RawClass::named("Gear").with_field("Teeth", "UInt8"))
        .add_class(folder);
    builder.build().unwrap()
}

/// Тест проверяет уточнение класса значением поля-дискриминатора.
#[test]
fn test_discriminator_selects_class() {
    let schema = part_schema();
    let part = schema.root_class_by_name("Part").unwrap();
    let gear = schema.root_class_by_name("Gear").unwrap();

    let mut doc = Document::new(crc32("Part"));
    let root = doc.root();
    assert_eq!(schema.effective_class(Some(part), doc.node(root)).unwrap(), Some(part));

    let type_value = registry()
        .encode_text(FieldType::StringId, &FieldSpec::default(), "Gear")
        .unwrap();
    doc.set_field(root, crc32("Type"), type_value);
    assert_eq!(schema.effective_class(Some(part), doc.node(root)).unwrap(), Some(gear));

    doc.set_field(root, crc32("Type"), vec![0x01]);
    assert_eq!(schema.effective_class(Some(part), doc.node(root)).unwrap(), None);
}

#[test]
fn test_dynamic_nested_classes() {
    let schema = part_schema();
    let folder = schema.root_class_by_name("Folder").unwrap();
    let doc = Document::new(crc32("Folder"));
    let chain = [doc.root()];
    let ancestors = AncestorChain::new(&doc, &chain);
    assert_eq!(
        schema.child_class(Some(folder), crc32("Gear"), &ancestors),
        schema.root_class_by_name("Gear")
    );
    assert_eq!(schema.child_class(Some(folder), crc32("Nothing"), &ancestors), None);
    assert_eq!(schema.child_class(None, crc32("Gear"), &ancestors), None);
}

#[test]
fn test_object_file_aliases() {
    let mut builder = SchemaBuilder::new();
    builder.add_class(RawClass::named("Gear")).add_object_file(RawObjectFile {
        name: "Machines".to_string(),
        aliases: vec!["MACH".to_string(), "gears".to_string()],
        object: Some(RawClass::default().with_field("Version", "UInt32")),
    });
    let schema = builder.build().unwrap();

    let file = schema.object_file("machines").unwrap();
    assert_eq!(file.name, "Machines");
    assert_eq!(schema.object_file("mach").map(|f| f.name.as_str()), Some("Machines"));
    assert_eq!(schema.object_file("Gears").map(|f| f.name.as_str()), Some("Machines"));
    assert!(schema.object_file("tools").is_none());

    let root = file.root.unwrap();
    assert!(schema.class(root).name.is_none());
    assert!(schema.class(root).fields.contains_key(&crc32("Version")));
}

/// Тест проверяет загрузку описаний из вложенных каталогов.
#[test]
fn test_load_dir() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("items");
    fs::create_dir_all(&nested).unwrap();
    fs::write(
        nested.join("gear.binaryclass.xml"),
        r#"<class name="Gear"><field name="Teeth" type="UInt8"/></class>"#,
    )
    .unwrap();
    fs::write(
        dir.path().join("part.binaryclass.xml"),
        r#"<class name="Part" class_field_name="Type">
             <field name="Type" type="StringId"/>
             <friend name="Gear"/>
           </class>"#,
    )
    .unwrap();
    fs::write(
        dir.path().join("machines.binaryobjectfile.xml"),
        r#"<object_file name="Machines"><alias>mach</alias><object name="Part"/></object_file>"#,
    )
    .unwrap();
    fs::write(dir.path().join("notes.xml"), "<ignored/>").unwrap();

    let schema = load_dir(dir.path()).unwrap();
    let gear = schema.root_class_by_name("Gear").unwrap();
    let part = schema.root_class_by_name("Part").unwrap();
    assert_eq!(schema.class(part).friends[0].class, gear);
    assert!(schema.object_file("MACH").is_some());
}

#[test]
fn test_load_dir_reports_bad_files() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("broken.binaryclass.xml"), "<class name=").unwrap();
    let err = load_dir(dir.path()).unwrap_err();
    assert!(err.to_string().contains("broken.binaryclass.xml"), "{err}");

    assert!(load_dir(&dir.path().join("missing")).is_err());
}
