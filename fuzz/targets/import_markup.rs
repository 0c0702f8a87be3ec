#![no_main]

use std::path::Path;

use binobj::{
    document::{encode_document, read_document},
    schema::SchemaGraph,
    text::{read_text_tree, Importer},
};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(markup) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(root) = read_text_tree(markup) else {
        return;
    };

    let schema = SchemaGraph::empty();
    // Внешние ссылки указывают в несуществующий каталог и дают ошибку.
    let importer = Importer::new(&schema).max_depth(64);
    let Ok(document) = importer.import(&root, None, Path::new("/nonexistent")) else {
        return;
    };
    let bytes = encode_document(&document).expect("imported document must encode");
    assert_eq!(read_document(&bytes).expect("encoded document must decode"), document);
});
