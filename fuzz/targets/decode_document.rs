#![no_main]

use arbitrary::Arbitrary;
use binobj::document::{encode_document, read_document, read_document_with, DecodeOptions};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    data: Vec<u8>,
    max_depth: u8,
    verify_header_counts: bool,
}

fuzz_target!(|input: FuzzInput| {
    let options = DecodeOptions {
        max_depth: usize::from(input.max_depth).max(1),
        verify_header_counts: input.verify_header_counts,
    };

    // Декодер не должен паниковать ни на каких данных.
    let Ok(document) = read_document_with(&input.data, &options) else {
        return;
    };

    // Общие узлы раскрываются, поэтому сравниваем с повторным декодированием.
    let bytes = encode_document(&document).expect("decoded document must encode");
    let again = read_document(&bytes).expect("encoded document must decode");
    assert_eq!(again, document);
});
