#![no_main]

use binobj::rml::{read_rml, write_rml};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok((rml, consumed)) = read_rml(data) else {
        return;
    };
    assert!(consumed <= data.len());

    let bytes = write_rml(&rml).expect("decoded RML must encode");
    let (again, _) = read_rml(&bytes).expect("encoded RML must decode");
    assert_eq!(again, rml);
});
