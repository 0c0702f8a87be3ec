//! binobj: кодек бинарных объектных документов, управляемый схемой.
//!
//! Документ представляет собой дерево узлов, у каждого есть хеш имени,
//! набор полей с непрозрачными байтами и дети. Схема объясняет, что значат
//! хеши и как читать байты полей, и позволяет перевести документ в текстовое
//! дерево разметки и обратно без потерь.

/// Configuration loading (defaults, `binobj.toml`, `BINOBJ_*`).
pub mod config;
/// Node tree, binary header, decoder and encoder.
pub mod document;
/// Typed field codecs and their registry.
pub mod fields;
/// CRC-32 of names and string id hashes.
pub mod hashing;
/// Logging setup on top of `tracing-subscriber`.
pub mod logging;
/// Embedded RML markup stored inside fields.
pub mod rml;
/// Class definitions, friends, discriminators.
pub mod schema;
/// Text projection of documents.
pub mod text;
/// Low-level byte reader and packed counts.
pub mod wire;

// -----------------------------------------------------------------------------
//  Frequently used public types
// -----------------------------------------------------------------------------

/// Error stack shared by every module.
pub use binobj_error::{BinobjResult, ResultExt, StackError, StatusCode};
pub use config::Settings;
/// Document tree and codec entry points.
pub use document::{
    encode_document, read_document, read_document_with, DecodeOptions, Document, Node, NodeId,
};
/// Field codecs.
pub use fields::{registry, FieldCodecRegistry, FieldHandler, FieldSpec, FieldType, FieldValue};
pub use hashing::crc32;
pub use rml::{read_rml, write_rml, RmlDocument, RmlNode};
/// Schema graph and its loaders.
pub use schema::{load_dir, AncestorChain, ClassId, SchemaBuilder, SchemaGraph};
/// Text projection.
pub use text::{
    export_document, import_document, read_text_tree, write_text_tree, DocumentLoader, Exporter,
    FsDocumentLoader, Importer, SplitExport, SplitLayout, TextNode,
};
