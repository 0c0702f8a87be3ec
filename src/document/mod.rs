//! Binary object documents.
//!
//! Документ состоит из заголовка (magic, версия, флаги, два счётчика) и
//! дерева узлов. Каждый узел несёт 32-битный хеш-идентификатор, упорядоченную
//! таблицу полей (хеш -> байты) и список детей. Дети могут быть обратными
//! ссылками на ранее прочитанные узлы, поэтому узлы хранятся в арене.

pub mod decode;
pub mod encode;
pub mod header;
pub mod node;

pub use decode::{read_document, read_document_with, read_node_tree, DecodeOptions};
pub use encode::{encode_document, write_document, write_node};
pub use header::{DocumentHeader, FILE_MAGIC, FORMAT_VERSION};
pub use node::{Document, Node, NodeId, Walk};
