//! Tree text projection.
//!
//! Бинарный документ отображается в дерево элементов разметки и обратно.
//! Схема даёт имена классам и полям и выбирает кодеки значений; всё, что
//! схема не описывает, проецируется по хешам и как шестнадцатеричные байты.
//!
//! ```text
//! <object name="Entity" def="EntityLibrary">
//!   <field name="Label" type="String">Crate</field>
//!   <object hash="0000ABCD">
//!     <field hash="00001234" type="BinHex">0A0B</field>
//!   </object>
//! </object>
//! ```

pub mod export;
pub mod import;
pub mod split;
pub mod tree;
pub mod xml;

pub use export::{export_document, Exporter};
pub use import::{import_document, DocumentLoader, FsDocumentLoader, Importer, LoadedDocument};
pub use split::{SplitExport, SplitFile, SplitLayout};
pub use tree::TextNode;
pub use xml::{read_text_tree, write_text_tree};

/// Тег узла документа.
pub const OBJECT_TAG: &str = "object";
/// Тег поля.
pub const FIELD_TAG: &str = "field";

pub const NAME_ATTR: &str = "name";
pub const HASH_ATTR: &str = "hash";
pub const TYPE_ATTR: &str = "type";
pub const ARRAY_TYPE_ATTR: &str = "array_type";
/// Имя описания файла объектов на корне.
pub const DEF_ATTR: &str = "def";
/// Относительный путь к файлу с поддеревом.
pub const EXTERNAL_ATTR: &str = "external";

/// Хеш в тексте: восемь шестнадцатеричных цифр в верхнем регистре.
pub fn format_hash(hash: u32) -> String {
    format!("{hash:08X}")
}
